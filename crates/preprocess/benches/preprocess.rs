use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use preprocess::{CpuPreProcessor, Preprocess};

/// Gradient pattern so the resizer does real work
fn create_test_pixels(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (width * height * 3) as usize];
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            pixels[idx] = (x % 256) as u8;
            pixels[idx + 1] = (y % 256) as u8;
            pixels[idx + 2] = ((x + y) % 256) as u8;
        }
    }
    pixels
}

fn benchmark_letterbox(c: &mut Criterion) {
    let mut group = c.benchmark_group("letterbox");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080), (3840, 2160)];

    for input_size in [(320, 320), (640, 640)] {
        let mut preprocessor = CpuPreProcessor::new(input_size);

        for (width, height) in resolutions.iter() {
            let pixels = create_test_pixels(*width, *height);

            group.bench_with_input(
                BenchmarkId::new(
                    format!("input_{}", input_size.0),
                    format!("{}x{}", width, height),
                ),
                &pixels,
                |b, pixels| {
                    b.iter(|| {
                        preprocessor
                            .preprocess(black_box(pixels), black_box(*width), black_box(*height))
                            .unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_letterbox);
criterion_main!(benches);
