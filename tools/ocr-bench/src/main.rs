//! OCR benchmark CLI.
//!
//! Runs the Vision recognizer and the reading-order assembler over image
//! files and reports latency plus the assembled text.
//!
//! Usage:
//!   ocr-bench <image.png> [more.png ...] [--fast] [--ltr] [--warm]
//!   ocr-bench --batch <dir> [--fast] [--ltr] [--warm]
//!
//! Single mode prints a JSON report per image. Batch mode prints CSV on
//! stdout and a latency summary on stderr.

#[cfg(target_os = "macos")]
fn main() {
    bench::main()
}

#[cfg(not(target_os = "macos"))]
fn main() {
    eprintln!("ocr-bench needs Apple Vision and only runs on macOS");
    std::process::exit(1);
}

#[cfg(target_os = "macos")]
mod bench {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use typeclip_lib::capture::{CaptureRegion, CapturedImage};
    use typeclip_lib::ocr::apple_vision::{self, VisionRecognizer};
    use typeclip_lib::ocr::{
        assemble_with, AssembleOptions, RecognitionLevel, TextRecognizer, WithinLineOrder,
    };

    struct Flags {
        fast: bool,
        ltr: bool,
        warm: bool,
        batch: Option<String>,
        files: Vec<String>,
    }

    struct Run {
        fragments: usize,
        chars: usize,
        wall_ms: f64,
        text: String,
    }

    fn parse_args() -> Flags {
        let mut flags = Flags {
            fast: false,
            ltr: false,
            warm: false,
            batch: None,
            files: Vec::new(),
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--fast" => flags.fast = true,
                "--ltr" => flags.ltr = true,
                "--warm" => flags.warm = true,
                "--batch" => match args.next() {
                    Some(dir) => flags.batch = Some(dir),
                    None => usage(),
                },
                other if other.starts_with("--") => usage(),
                _ => flags.files.push(arg),
            }
        }
        if flags.batch.is_none() && flags.files.is_empty() {
            usage();
        }
        flags
    }

    fn usage() -> ! {
        eprintln!("Usage:");
        eprintln!("  ocr-bench <image.png> [more.png ...] [--fast] [--ltr] [--warm]");
        eprintln!("  ocr-bench --batch <dir> [--fast] [--ltr] [--warm]");
        std::process::exit(2);
    }

    pub fn main() {
        env_logger::init();
        let flags = parse_args();

        if flags.warm {
            let start = Instant::now();
            apple_vision::warm_up();
            eprintln!("Vision warm-up: {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
        }

        let level = if flags.fast {
            RecognitionLevel::Fast
        } else {
            RecognitionLevel::Accurate
        };
        let recognizer = VisionRecognizer::new(level, !flags.fast);
        let options = AssembleOptions {
            within_line: if flags.ltr {
                WithinLineOrder::LeftToRight
            } else {
                WithinLineOrder::Discovery
            },
            ..Default::default()
        };

        match &flags.batch {
            Some(dir) => run_batch(dir, &recognizer, &options, level),
            None => {
                for file in &flags.files {
                    run_single(Path::new(file), &recognizer, &options, level);
                }
            }
        }
    }

    fn load(path: &Path) -> Result<CapturedImage, String> {
        let image = image::open(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?
            .to_rgba8();
        let region = CaptureRegion::new(0.0, 0.0, image.width() as f64, image.height() as f64)
            .ok_or_else(|| format!("{}: empty image", path.display()))?;
        Ok(CapturedImage::new(region, image))
    }

    fn recognize(
        path: &Path,
        recognizer: &VisionRecognizer,
        options: &AssembleOptions,
    ) -> Result<Run, String> {
        let captured = load(path)?;
        let start = Instant::now();
        let fragments = recognizer.recognize(&captured).map_err(|e| e.to_string())?;
        let text = assemble_with(&fragments, options);
        Ok(Run {
            fragments: fragments.len(),
            chars: text.chars().count(),
            wall_ms: start.elapsed().as_secs_f64() * 1000.0,
            text,
        })
    }

    fn run_single(
        path: &Path,
        recognizer: &VisionRecognizer,
        options: &AssembleOptions,
        level: RecognitionLevel,
    ) {
        let run = match recognize(path, recognizer, options) {
            Ok(run) => run,
            Err(e) => {
                eprintln!("OCR failed: {}", e);
                std::process::exit(1);
            }
        };

        let escaped = run
            .text
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        println!("{{");
        println!("  \"file\": \"{}\",", path.display());
        println!("  \"recognitionLevel\": \"{:?}\",", level);
        println!("  \"withinLine\": \"{:?}\",", options.within_line);
        println!("  \"fragments\": {},", run.fragments);
        println!("  \"charCount\": {},", run.chars);
        println!("  \"wallTimeMs\": {:.2},", run.wall_ms);
        println!("  \"text\": \"{}\"", escaped);
        println!("}}");
    }

    fn image_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "png" | "jpg" | "jpeg"))
            })
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn run_batch(
        dir_path: &str,
        recognizer: &VisionRecognizer,
        options: &AssembleOptions,
        level: RecognitionLevel,
    ) {
        let entries = match image_files(Path::new(dir_path)) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                eprintln!("No image files found in {}", dir_path);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Cannot read {}: {}", dir_path, e);
                std::process::exit(1);
            }
        };

        println!("filename,fragments,char_count,lines,wall_ms,recognition_level");
        let mut latencies = Vec::with_capacity(entries.len());
        let mut failures = 0usize;

        for path in &entries {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match recognize(path, recognizer, options) {
                Ok(run) => {
                    let lines = if run.text.is_empty() { 0 } else { run.text.lines().count() };
                    println!(
                        "{},{},{},{},{:.2},{:?}",
                        filename, run.fragments, run.chars, lines, run.wall_ms, level
                    );
                    latencies.push(run.wall_ms);
                }
                Err(e) => {
                    failures += 1;
                    eprintln!("  {}: {}", filename, e);
                }
            }
            std::io::stdout().flush().ok();
        }

        eprintln!("\n--- Benchmark Summary ---");
        eprintln!("  Images processed: {}", entries.len());
        eprintln!("  Failures: {}", failures);
        if !latencies.is_empty() {
            let target = match level {
                RecognitionLevel::Accurate => 300.0,
                RecognitionLevel::Fast => 100.0,
            };
            print_latency_summary(&format!("{:?}", level), &mut latencies, target);
        }
    }

    fn print_latency_summary(label: &str, latencies: &mut [f64], target_ms: f64) {
        latencies.sort_by(|a, b| a.total_cmp(b));
        let median = latencies[latencies.len() / 2];
        let p99_idx = ((latencies.len() as f64 * 0.99).ceil() as usize).min(latencies.len() - 1);
        let p99 = latencies[p99_idx];
        let avg: f64 = latencies.iter().sum::<f64>() / latencies.len() as f64;

        eprintln!("  [{}]", label);
        eprintln!("    Median: {:.1}ms", median);
        eprintln!("    Average: {:.1}ms", avg);
        eprintln!("    P99: {:.1}ms", p99);
        eprintln!(
            "    Target (< {:.0}ms): {}",
            target_ms,
            if median < target_ms { "PASS" } else { "FAIL" }
        );
    }
}
