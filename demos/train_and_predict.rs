//! Train, persist, and reuse a digit classifier.
//!
//! Walks the whole lifecycle on a small synthetic dataset: fit with
//! held-out scoring, save to a model store, restore into a fresh
//! instance, and classify a PNG written to disk.

use image::{GrayImage, Luma};
use reconocer::prelude::*;
use std::io::Cursor;

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== Digit recognition: train, save, load, predict ===\n");

    // Synthetic "digits": an ink block in a distinct grid cell per class.
    let cells = [(0_usize, 0_usize), (13, 13), (27, 27)];
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (label, &(gr, gc)) in cells.iter().enumerate() {
        for offset in 0..3 {
            let canvas = ink_canvas(gr, (gc + offset).min(27));
            rows.push(compress(&canvas)?.into_vec());
            labels.push(label);
        }
    }
    let x = Matrix::from_rows(&rows).expect("uniform rows");
    let training_set = TrainingSet::new(x.clone(), labels.clone(), x, labels)?;

    let store = std::env::temp_dir().join("reconocer_demo.safetensors");
    let mut model = DigitClassifier::new(1, 2)?.with_store_path(&store);
    model.fit(&training_set)?;
    model.save()?;
    println!("Model fitted and saved to {}", store.display());

    // Restore into a fresh instance, as a later process would.
    let mut restored = DigitClassifier::uninitialized().with_store_path(&store);
    restored.load()?;
    println!("Restored model: k={}, p={}\n", restored.k(), restored.p());

    // Classify a hand-"drawn" PNG through the image path.
    let png = std::env::temp_dir().join("reconocer_demo_digit.png");
    write_ink_png(&png, 27, 27)?;
    let digit = restored.predict_image_path(&png)?;
    println!("{} classified as digit class {digit}", png.display());

    std::fs::remove_file(&store).ok();
    std::fs::remove_file(&png).ok();
    Ok(())
}

fn ink_canvas(grid_row: usize, grid_col: usize) -> Matrix<u8> {
    let mut pixels = vec![255_u8; 280 * 280];
    for r in 0..10 {
        for c in 0..10 {
            pixels[(grid_row * 10 + r) * 280 + (grid_col * 10 + c)] = 0;
        }
    }
    Matrix::from_vec(280, 280, pixels).expect("280x280 canvas")
}

fn write_ink_png(path: &std::path::Path, grid_row: usize, grid_col: usize) -> Result<()> {
    let mut img = GrayImage::from_pixel(280, 280, Luma([255]));
    for r in 0..10 {
        for c in 0..10 {
            img.put_pixel(
                (grid_col * 10 + c) as u32,
                (grid_row * 10 + r) as u32,
                Luma([0]),
            );
        }
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
