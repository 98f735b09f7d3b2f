use image::{ImageReader, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use sift_cli::{Config, FeatureMatcher, FeatureStore, SiftPipeline};
use sift_detect::ImagePreprocessing;
use std::time::Instant;

fn main() {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().expect("usage: sift <image> [reference-features.json]");
    let reference_path = args.next();

    // Load image and convert to grayscale (floor-average of the channels)
    let rgb = ImageReader::open(&image_path)
        .expect("Image not found")
        .decode()
        .expect("Decode failed")
        .to_rgb8();
    let (w, h) = rgb.dimensions();
    let gray = ImagePreprocessing::grayscale_from_rgb(rgb.as_raw(), w as usize, h as usize)
        .expect("Grayscale conversion failed");

    let pipeline = SiftPipeline::with_thread_pool(Config::default()).expect("Invalid configuration");

    // Time the full pipeline
    let t0 = Instant::now();
    let features = pipeline.get_features(&gray).expect("Feature extraction failed");
    let elapsed = t0.elapsed();

    println!("Time taken: {:.2?}", elapsed);
    println!("Extracted {} descriptors", features.len());

    let mut output: RgbaImage = image::DynamicImage::ImageRgb8(rgb).into_rgba8();

    match reference_path {
        Some(path) => {
            // Object detection against a saved reference feature set
            let reference = FeatureStore::load(&path).expect("Failed to load reference features");
            let matches = FeatureMatcher::match_features(&reference, &features, 150.0);
            println!("Matched {}/{} reference descriptors", matches.len(), reference.len());

            let detection = pipeline
                .detect_object(&gray, &reference, 150.0, 0.5)
                .expect("Detection failed");
            match detection.bounding_box {
                Some(bb) if detection.found => {
                    println!("Object found at ({}, {})..({}, {})", bb.x_min, bb.y_min, bb.x_max, bb.y_max);
                    let rect = Rect::at(bb.x_min, bb.y_min).of_size(
                        (bb.x_max - bb.x_min).max(1) as u32,
                        (bb.y_max - bb.y_min).max(1) as u32,
                    );
                    draw_hollow_rect_mut(&mut output, rect, Rgba([0, 255, 0, 255]));
                }
                _ => println!("Object not found"),
            }
        }
        None => {
            // Save the extracted features next to the image
            let feature_path = format!("{}.features.json", image_path);
            FeatureStore::save(&feature_path, &features).expect("Failed to save features");
            println!("Saved features to {}", feature_path);
        }
    }

    // Draw red circles at each descriptor position
    for d in &features {
        draw_hollow_circle_mut(&mut output, (d.x, d.y), 3, Rgba([255, 0, 0, 255]));
    }

    let out_path = format!("{}.keypoints.png", image_path);
    output.save(&out_path).expect("Failed to save output image");
    println!("Saved result image as {}", out_path);
}
