#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes a real gradient PNG that the default codec can optimize.
pub fn create_png(path: &Path, size: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbaImage::from_fn(size, size, |x, y| {
        Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    DynamicImage::ImageRgba8(img)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Writes JPEG content under whatever name the caller picks.
pub fn create_jpeg(path: &Path) {
    let img = RgbImage::from_pixel(24, 24, Rgb([30, 60, 90]));
    DynamicImage::ImageRgb8(img)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

pub fn create_test_image_files(temp_dir: &Path) -> Vec<PathBuf> {
    let png_a = temp_dir.join("first.png");
    let png_b = temp_dir.join("second.PNG");
    let jpg_file = temp_dir.join("photo.jpg");
    let txt_file = temp_dir.join("notes.txt");

    create_png(&png_a, 64);
    create_png(&png_b, 32);
    create_jpeg(&jpg_file);
    File::create(&txt_file)
        .unwrap()
        .write_all(b"not an image")
        .unwrap();

    vec![png_a, png_b, jpg_file, txt_file]
}

pub fn create_nested_directory_structure(temp_dir: &Path) -> PathBuf {
    let subdir = temp_dir.join("subdir");
    create_png(&subdir.join("nested.png"), 16);
    File::create(subdir.join("nested.txt"))
        .unwrap()
        .write_all(b"nested text")
        .unwrap();
    subdir
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
