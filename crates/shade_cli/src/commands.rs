use crate::cli::*;
use crate::output::print_out;
use anyhow::{Context, bail};
use serde::Serialize;
use shade_core::catalog::classify_product_shades;
use shade_core::model::color_mapping_files;
use shade_core::official::{apply_official_mapping, strip_special_in_dir};
use shade_core::reconcile::{load_reference_names, reconcile};
use shade_core::scrape::{
    HttpClient, ScrapeStatus, ShadeScraper, build_shade_queue, download_product_images,
    read_queue, save_scraped_product, scrape_product, shade_url, write_queue,
};
use shade_core::transform::{
    BadgeCropOptions, CompressOptions, CompressionOutcome, FloodOutcome, alpha_key_file,
    badge_crop_file, compress_file, compress_large_images, find_large_images, flood_replace_dir,
    flood_replace_file, replace_white_dir, replace_white_file,
};
use shade_core::{
    BatchReport, ColorMapping, Config, Product, extract_all_swatches, read_json, write_json,
};
use std::path::{Path, PathBuf};

pub fn run(cli: Cli) -> anyhow::Result<bool> {
    let cwd = std::env::current_dir().context("reading working directory")?;
    let cfg = Config::discover(cli.config.as_deref(), &cwd)?;
    let json = cli.json;
    match cli.command {
        Commands::Compress(args) => compress(args, &cfg, json),
        Commands::Background(args) => background(args, &cfg, json),
        Commands::FloodBackground(args) => flood_background(args, &cfg, json),
        Commands::Key(args) => key(args, &cfg, json),
        Commands::BadgeCrop(args) => badge(args, &cfg, json),
        Commands::ExtractSwatches(args) => swatches(args, json),
        Commands::Classify(args) => classify(args, &cfg, json),
        Commands::Official(args) => official(args, json),
        Commands::StripSpecial(args) => strip_special(args, json),
        Commands::PrepareQueue(args) => prepare_queue(args, &cfg, json),
        Commands::ScrapeProduct(args) => scrape_one(args, &cfg, json),
        Commands::ScrapeShades(args) => scrape_shades(args, &cfg, json),
        Commands::Reconcile(args) => reconcile_cmd(args, &cfg, json),
    }
}

fn tally(report: &BatchReport) -> String {
    format!(
        "{} succeeded, {} skipped, {} failed",
        report.succeeded, report.skipped, report.failed
    )
}

fn describe_compression(o: &CompressionOutcome) -> String {
    if o.kept_original {
        format!("{}: kept original ({} bytes)", o.path.display(), o.original_bytes)
    } else {
        format!(
            "{}: {} -> {} bytes ({:.1}% saved{})",
            o.path.display(),
            o.original_bytes,
            o.new_bytes,
            o.saved_percent(),
            if o.resized { ", resized" } else { "" }
        )
    }
}

fn print_groups(mapping: &ColorMapping) -> Vec<String> {
    let mut lines: Vec<String> = mapping
        .groups_by_size()
        .into_iter()
        .map(|(color, names)| {
            let preview: Vec<&str> = names.iter().take(3).map(String::as_str).collect();
            let more = if names.len() > 3 { "..." } else { "" };
            format!("{:12} ({:2}): {}{more}", color.as_str(), names.len(), preview.join(", "))
        })
        .collect();
    lines.push(format!(
        "{:12} ({:2} / {} shades)",
        "TOTAL",
        mapping.classified(),
        mapping.total_shades
    ));
    lines
}

#[derive(Serialize)]
struct LargeImage {
    path: PathBuf,
    bytes: u64,
}

#[derive(Serialize)]
struct CompressRun {
    files: Vec<CompressionOutcome>,
    report: BatchReport,
    saved_bytes: u64,
}

fn compress(args: CompressArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let opts = CompressOptions {
        quality: args.quality.unwrap_or(cfg.compress.options.quality),
        max_dimension: args
            .max_dimension
            .unwrap_or(cfg.compress.options.max_dimension),
    };
    if !args.path.is_dir() {
        let outcome = compress_file(&args.path, args.output.as_deref(), &opts)
            .with_context(|| format!("compressing {}", args.path.display()))?;
        print_out(json, true, &outcome, |o| vec![describe_compression(o)])?;
        return Ok(true);
    }

    let min_bytes = args.min_size_kb.unwrap_or(cfg.compress.min_size_kb) * 1024;
    if args.dry_run {
        let found: Vec<LargeImage> = find_large_images(&args.path, min_bytes)?
            .into_iter()
            .map(|(path, bytes)| LargeImage { path, bytes })
            .collect();
        print_out(json, true, &found, |rows| {
            rows.iter()
                .map(|r| format!("{:>10}\t{}", r.bytes, r.path.display()))
                .collect()
        })?;
        return Ok(true);
    }

    let (files, report) = compress_large_images(&args.path, min_bytes, &opts)?;
    let saved_bytes = files.iter().map(CompressionOutcome::saved_bytes).sum();
    let run = CompressRun {
        files,
        report,
        saved_bytes,
    };
    print_out(json, report.all_ok(), &run, |r| {
        let mut lines: Vec<String> = r.files.iter().map(describe_compression).collect();
        lines.push(format!("{}, {} bytes saved", tally(&r.report), r.saved_bytes));
        lines
    })?;
    Ok(report.all_ok())
}

#[derive(Serialize)]
struct Replaced {
    output: PathBuf,
    replaced_pixels: u64,
}

fn background(args: BackgroundArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let threshold = args.threshold.unwrap_or(cfg.background.threshold);
    let grey = args.grey.unwrap_or(cfg.background.grey);
    let output = args.output.clone().unwrap_or_else(|| args.input.clone());
    if args.input.is_dir() {
        let report = replace_white_dir(&args.input, &output, threshold, grey)?;
        print_out(json, report.all_ok(), &report, |r| vec![tally(r)])?;
        return Ok(report.all_ok());
    }
    let replaced_pixels = replace_white_file(&args.input, &output, threshold, grey)?;
    let out = Replaced {
        output: shade_core::transform::png_path(&output),
        replaced_pixels,
    };
    print_out(json, true, &out, |o| {
        vec![format!("{}: {} pixels replaced", o.output.display(), o.replaced_pixels)]
    })?;
    Ok(true)
}

#[derive(Serialize)]
struct FloodRow {
    path: PathBuf,
    outcome: FloodOutcome,
}

#[derive(Serialize)]
struct FloodRun {
    files: Vec<FloodRow>,
    report: BatchReport,
}

fn flood_background(args: FloodArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let mut opts = cfg.background.flood_options();
    if let Some(t) = args.white_threshold {
        opts.white_threshold = t;
    }
    if let Some(t) = args.tolerance {
        opts.flood_tolerance = t;
    }
    if let Some(g) = args.grey {
        opts.grey = g;
    }
    let names: Vec<String> = if args.all_images {
        Vec::new()
    } else if args.files.is_empty() {
        cfg.background.flood_files.clone()
    } else {
        args.files.iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect()
    };

    let mut run = FloodRun {
        files: Vec::new(),
        report: BatchReport::default(),
    };
    for path in &args.paths {
        if path.is_dir() {
            let (outcomes, report) = flood_replace_dir(path, &names, &opts, args.dry_run)?;
            run.report.succeeded += report.succeeded;
            run.report.skipped += report.skipped;
            run.report.failed += report.failed;
            run.files
                .extend(outcomes.into_iter().map(|(path, outcome)| FloodRow { path, outcome }));
            continue;
        }
        match flood_replace_file(path, &opts, args.dry_run) {
            Ok(outcome) => {
                match outcome {
                    FloodOutcome::Processed(_) => run.report.succeeded += 1,
                    _ => run.report.skipped += 1,
                }
                run.files.push(FloodRow {
                    path: path.clone(),
                    outcome,
                });
            }
            Err(e) => {
                tracing::warn!("{e}");
                run.report.failed += 1;
            }
        }
    }
    let ok = run.report.all_ok();
    print_out(json, ok, &run, |r| {
        let mut lines: Vec<String> = r
            .files
            .iter()
            .map(|f| match f.outcome {
                FloodOutcome::Processed(n) if args.dry_run => {
                    format!("{}: would process ({n})", f.path.display())
                }
                FloodOutcome::Processed(n) => format!("{}: {n} pixels filled", f.path.display()),
                FloodOutcome::AlreadyGrey => format!("{}: already grey", f.path.display()),
                FloodOutcome::NoWhiteBorder => format!("{}: no white border", f.path.display()),
            })
            .collect();
        lines.push(tally(&r.report));
        lines
    })?;
    Ok(ok)
}

#[derive(Serialize)]
struct Written {
    output: PathBuf,
}

fn key(args: KeyArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let t0 = args.t0.unwrap_or(cfg.keying.t0);
    let t1 = args.t1.unwrap_or(cfg.keying.t1);
    if t0 >= t1 {
        bail!("t0 ({t0}) must be below t1 ({t1})");
    }
    let output = alpha_key_file(&args.input, &args.output, t0, t1)?;
    print_out(json, true, &Written { output }, |w| vec![w.output.display().to_string()])?;
    Ok(true)
}

fn badge(args: BadgeArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let opts = BadgeCropOptions {
        keep_left: args.keep_left.unwrap_or(cfg.badge.keep_left),
        scale: args.scale.unwrap_or(cfg.badge.scale),
        x_position: args.x_position.unwrap_or(cfg.badge.x_position),
        ..cfg.badge
    };
    if !(0.0..=1.0).contains(&opts.keep_left) || opts.keep_left == 0.0 || opts.scale <= 0.0 {
        bail!("keep-left must be in (0, 1] and scale positive");
    }
    let output = badge_crop_file(&args.input, &args.output, &opts)?;
    print_out(json, true, &Written { output }, |w| vec![w.output.display().to_string()])?;
    Ok(true)
}

fn swatches(args: SwatchArgs, json: bool) -> anyhow::Result<bool> {
    let colors = extract_all_swatches(&args.shades_dir)?;
    if let Some(out) = &args.output {
        write_json(out, &colors)?;
    }
    print_out(json, true, &colors, |c| {
        c.iter()
            .map(|(folder, sw)| {
                format!(
                    "{folder:30} {} RGB({:3},{:3},{:3})",
                    sw.hex, sw.rgb[0], sw.rgb[1], sw.rgb[2]
                )
            })
            .collect()
    })?;
    Ok(true)
}

fn default_mapping_path(product: &Path, slug: &str, suffix: &str) -> PathBuf {
    let dir = product.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("color_mapping_{slug}{suffix}.json"))
}

fn load_product(path: &Path) -> anyhow::Result<Product> {
    let product: Product = read_json(path)?;
    if product.shades.is_empty() {
        bail!("{} has no shades", path.display());
    }
    Ok(product)
}

fn classify(args: ClassifyArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let product = load_product(&args.product)?;
    let heuristic = args.heuristic.unwrap_or(cfg.extraction.heuristic);
    let extractor = cfg.extraction.extractor_for(heuristic);
    let namer = heuristic.namer();
    let (mapping, stats) = classify_product_shades(
        &product,
        &args.images,
        &extractor,
        namer.as_ref(),
        heuristic.number(),
    )?;
    let output = args.output.unwrap_or_else(|| {
        default_mapping_path(
            &args.product,
            &product.slug,
            &format!("_v{}", heuristic.number()),
        )
    });
    write_json(&output, &mapping)?;
    let ok = stats.missing_images == 0 && stats.failed == 0;
    print_out(json, ok, &mapping, |m| {
        let mut lines = print_groups(m);
        if stats.missing_images + stats.failed > 0 {
            lines.push(format!(
                "{} images missing, {} extractions failed",
                stats.missing_images, stats.failed
            ));
        }
        lines.push(format!("saved to {}", output.display()));
        lines
    })?;
    Ok(ok)
}

#[derive(Serialize)]
struct OfficialRun {
    mapping: ColorMapping,
    skipped: Vec<String>,
    output: PathBuf,
}

fn official(args: OfficialArgs, json: bool) -> anyhow::Result<bool> {
    let product = load_product(&args.product)?;
    let result = apply_official_mapping(&product);
    let output = args
        .output
        .unwrap_or_else(|| default_mapping_path(&args.product, &product.slug, ""));
    write_json(&output, &result.mapping)?;
    let special = result.special_count();
    let run = OfficialRun {
        mapping: result.mapping,
        skipped: result.skipped,
        output,
    };
    print_out(json, true, &run, |r| {
        let mut lines = print_groups(&r.mapping);
        lines.push(format!("{special} special, {} skipped", r.skipped.len()));
        lines.push(format!("saved to {}", r.output.display()));
        lines
    })?;
    Ok(true)
}

fn strip_special(args: StripSpecialArgs, json: bool) -> anyhow::Result<bool> {
    let changed = strip_special_in_dir(&args.dir)?;
    print_out(json, true, &changed, |files| {
        let mut lines: Vec<String> = files.iter().map(|p| format!("updated {}", p.display())).collect();
        lines.push(format!("{} files updated", files.len()));
        lines
    })?;
    Ok(true)
}

#[derive(Serialize)]
struct QueueRun {
    output: PathBuf,
    mappings: usize,
    unreadable: usize,
    rows: usize,
    sample_url: Option<String>,
}

fn prepare_queue(args: PrepareQueueArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let files = color_mapping_files(&args.mappings_dir)?;
    let mut mappings = Vec::new();
    let mut unreadable = 0;
    for file in &files {
        match read_json::<ColorMapping>(file) {
            Ok(m) => mappings.push(m),
            Err(e) => {
                tracing::warn!("{e}");
                unreadable += 1;
            }
        }
    }
    let rows = build_shade_queue(&mappings);
    write_queue(&args.output, &rows)?;
    let run = QueueRun {
        output: args.output,
        mappings: mappings.len(),
        unreadable,
        rows: rows.len(),
        sample_url: rows.first().map(|r| {
            shade_url(&cfg.scraper.base_url, &r.main_color, &r.shade_number, &r.shade_name)
        }),
    };
    let ok = unreadable == 0;
    print_out(json, ok, &run, |r| {
        let mut lines = vec![format!(
            "{} shades from {} mapping files written to {}",
            r.rows,
            r.mappings,
            r.output.display()
        )];
        if let Some(url) = &r.sample_url {
            lines.push(format!("sample URL: {url}"));
        }
        lines
    })?;
    Ok(ok)
}

#[derive(Serialize)]
struct ProductRun {
    product: Product,
    saved_to: PathBuf,
    images: BatchReport,
}

fn scrape_one(args: ScrapeProductArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let client = HttpClient::new(&cfg.scraper)?;
    let mut product = scrape_product(&client, &args.url, &cfg.scraper)?;
    let images = if args.no_images {
        BatchReport::default()
    } else {
        download_product_images(&client, &mut product, &args.out_dir)
    };
    let saved_to = save_scraped_product(&product, &args.out_dir)?;
    let run = ProductRun {
        product,
        saved_to,
        images,
    };
    let ok = images.all_ok();
    print_out(json, ok, &run, |r| {
        vec![
            format!("product: {}", r.product.title),
            format!("slug: {}", r.product.slug),
            format!("images: {}", tally(&r.images)),
            format!("saved to {}", r.saved_to.display()),
        ]
    })?;
    Ok(ok)
}

fn scrape_shades(args: ScrapeShadesArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let rows = read_queue(&args.queue)?;
    let client = HttpClient::new(&cfg.scraper)?;
    let mut scraper =
        ShadeScraper::new(client, cfg.scraper.clone(), &args.out_dir)?.with_downloads(!args.no_images);
    let summary = scraper.run(&rows, args.start, args.max)?;
    let errors = scraper
        .results()
        .iter()
        .filter(|r| matches!(r.status, ScrapeStatus::Error(_)))
        .count();
    let ok = errors == 0 && summary.images.all_ok();
    print_out(json, ok, &summary, |s| {
        vec![
            format!("complete: {}/{} successful", s.successful, s.scraped),
            format!("images: {}", tally(&s.images)),
            format!("output: {}", scraper.results_path().display()),
        ]
    })?;
    Ok(ok)
}

fn reconcile_cmd(args: ReconcileArgs, cfg: &Config, json: bool) -> anyhow::Result<bool> {
    let reference = load_reference_names(&args.reference)?;
    let products: Vec<Product> = read_json(&args.products)?;
    let prefix = args.prefix.unwrap_or_else(|| cfg.scraper.slug_prefix.clone());
    let report = reconcile(&reference, &products, &prefix, args.images_dir.as_deref());
    let ok = report.all_matched();
    print_out(json, ok, &report, |r| {
        let mut lines = vec![
            format!("scraped products: {}", r.scraped),
            format!("matched: {}/{}", r.matched.len(), r.reference),
        ];
        lines.extend(
            r.matched
                .iter()
                .map(|m| format!("  {:40} -> {} ({} images)", m.reference_name, m.slug, m.images_count)),
        );
        lines.extend(r.unmatched.iter().map(|n| format!("  not found: {n}")));
        if !r.without_images.is_empty() {
            lines.push(format!("without images: {}", r.without_images.join(", ")));
        }
        lines
    })?;
    Ok(ok)
}
