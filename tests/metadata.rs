use sd_params::png::chunk::{self, Chunk};
use sd_params::{MetadataError, batch_replace, has_backup, read_metadata, write_metadata};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn png_bytes(parameters: Option<&str>) -> Vec<u8> {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&2u32.to_be_bytes());
    ihdr.extend_from_slice(&2u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);

    let mut chunks = vec![Chunk::new(*b"IHDR", ihdr)];
    if let Some(text) = parameters {
        let mut data = b"parameters\0".to_vec();
        data.extend_from_slice(text.as_bytes());
        chunks.push(Chunk::new(*b"tEXt", data));
    }
    chunks.push(Chunk::new(*b"IDAT", vec![0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]));
    chunks.push(Chunk::new(*b"IEND", Vec::new()));
    chunk::serialize(&chunks).unwrap()
}

fn jpeg_bytes(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x20];
    bytes.extend_from_slice(b"Exif\0\0UNICODE\0\x3C");
    bytes.extend(text.encode_utf16().flat_map(|c| c.to_be_bytes()));
    bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00, 0xFF, 0xD9]);
    bytes
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn batch_with_one_corrupted_file() {
    let dir = TempDir::new().unwrap();
    for i in 0..3 {
        write_file(dir.path(), &format!("match{i}.png"), &png_bytes(Some("masterpiece, red hair")));
    }
    write_file(dir.path(), "match3.jpg", &jpeg_bytes("red hair, smiling"));
    write_file(dir.path(), "other.png", &png_bytes(Some("blue eyes")));

    let mut corrupted = png_bytes(Some("red hair"));
    corrupted[0] = 0x00;
    write_file(dir.path(), "corrupted.png", &corrupted);

    let result = batch_replace(dir.path(), "red hair", "silver hair", true).unwrap();

    assert_eq!(result.modified_count, 4);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].file, "corrupted.png");

    assert_eq!(
        read_metadata(&dir.path().join("match0.png")).unwrap(),
        "masterpiece, silver hair"
    );
    assert_eq!(
        read_metadata(&dir.path().join("match3.jpg")).unwrap(),
        "silver hair, smiling"
    );
    assert!(has_backup(&dir.path().join("match0.png")));
    assert!(!has_backup(&dir.path().join("other.png")));
    assert!(!has_backup(&dir.path().join("corrupted.png")));
    assert_eq!(fs::read(dir.path().join("corrupted.png")).unwrap(), corrupted);
}

#[test]
fn batch_without_matches_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let a = png_bytes(Some("forest"));
    write_file(dir.path(), "a.png", &a);
    write_file(dir.path(), "b.png", &png_bytes(None));
    write_file(dir.path(), "c.jpg", &jpeg_bytes("desert"));

    let result = batch_replace(dir.path(), "ocean", "lake", true).unwrap();
    assert_eq!(result.modified_count, 0);
    assert!(result.errors.is_empty());
    assert_eq!(fs::read(dir.path().join("a.png")).unwrap(), a);
}

#[test]
fn backup_survives_repeated_saves() {
    let dir = TempDir::new().unwrap();
    let original = png_bytes(Some("v1"));
    let path = write_file(dir.path(), "img.png", &original);

    write_metadata(&path, "v2", true).unwrap();
    write_metadata(&path, "v3", true).unwrap();

    assert_eq!(read_metadata(&path).unwrap(), "v3");
    assert_eq!(fs::read(dir.path().join("img.png.backup")).unwrap(), original);
}

#[test]
fn insert_into_png_without_parameters() {
    let dir = TempDir::new().unwrap();
    let original = png_bytes(None);
    let path = write_file(dir.path(), "img.png", &original);
    assert_eq!(read_metadata(&path).unwrap(), "");

    write_metadata(&path, "Steps: 20, Sampler: DPM++ 2M", false).unwrap();

    let chunks = chunk::parse(&fs::read(&path).unwrap()).unwrap();
    let kinds: Vec<_> = chunks.iter().map(|c| c.kind_str()).collect();
    assert_eq!(kinds, ["IHDR", "tEXt", "IDAT", "IEND"]);

    let before = chunk::parse(&original).unwrap();
    assert_eq!(chunks[0], before[0]);
    assert_eq!(chunks[2], before[1]);
    assert_eq!(chunks[3], before[2]);
    assert_eq!(read_metadata(&path).unwrap(), "Steps: 20, Sampler: DPM++ 2M");
}

#[test]
fn jpeg_without_end_marker_is_untouched() {
    let dir = TempDir::new().unwrap();
    let mut bytes = jpeg_bytes("prompt");
    let dqt = bytes.windows(2).position(|w| w == [0xFF, 0xDB]).unwrap();
    bytes[dqt + 1] = 0xC4;
    let path = write_file(dir.path(), "img.jpg", &bytes);

    assert_eq!(read_metadata(&path).unwrap(), "");
    let err = write_metadata(&path, "new", true).unwrap_err();
    assert!(matches!(err, MetadataError::Format(_)));
    assert_eq!(fs::read(&path).unwrap(), bytes);
    assert!(!has_backup(&path));
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.png");
    assert!(matches!(read_metadata(&path), Err(MetadataError::NotFound(_))));
    assert!(matches!(
        write_metadata(&path, "x", true),
        Err(MetadataError::NotFound(_))
    ));
    assert!(!has_backup(&path));
}
