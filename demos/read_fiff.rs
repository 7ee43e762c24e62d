/// Read a FIFF file: block outline, measurement metadata and the first second
/// of raw data.
///
/// Usage: cargo run --example read_fiff -- path/to/file.fif
/// Set RUST_LOG=debug to see how the directory and tree were built.
use fiffio::{
    open_fiff, open_raw, BlockId, Child, MeasInfo, Tree, FIFFV_EEG_CH, FIFFV_MEG_CH, FIFFV_STIM_CH,
};
use std::env;
use std::path::Path;

fn print_outline(tree: &Tree, id: BlockId, depth: usize) {
    let block = tree.block(id);
    println!("{}block {} ({} tags)", "  ".repeat(depth), block.kind, block.nent());
    for child in &block.children {
        if let Child::Block(sub) = child {
            print_outline(tree, *sub, depth + 1);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Get file path from command line
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <fiff_file>", args[0]);
        eprintln!("Example: {} data/sample_audvis_raw.fif", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    println!("Opening FIFF file: {}", path.display());
    println!("{}", "=".repeat(60));

    let mut file = open_fiff(path)?;
    println!(
        "{} tags, directory from {:?}",
        file.directory().len(),
        file.strategy()
    );
    print_outline(file.tree(), Tree::ROOT, 0);
    println!();

    let meas_info = MeasInfo::read(&mut file)?;
    drop(file);

    println!("Basic Information:");
    println!("  Number of channels: {}", meas_info.nchan);
    println!("  Sampling frequency: {:.2} Hz", meas_info.sfreq);
    if let Some(trans) = meas_info.dev_head_t() {
        println!("  Device to head transform: {}", trans.description());
    }
    if !meas_info.bads.is_empty() {
        println!("  Bad channels: {}", meas_info.bads.join(", "));
    }
    println!();

    // Count channels by type
    let mut meg_count = 0;
    let mut eeg_count = 0;
    let mut stim_count = 0;
    let mut other_count = 0;

    for ch in &meas_info.channels {
        match ch.kind {
            FIFFV_MEG_CH => meg_count += 1,
            FIFFV_EEG_CH => eeg_count += 1,
            FIFFV_STIM_CH => stim_count += 1,
            _ => other_count += 1,
        }
    }

    println!("Channel Types:");
    if meg_count > 0 {
        println!("  MEG channels: {}", meg_count);
    }
    if eeg_count > 0 {
        println!("  EEG channels: {}", eeg_count);
    }
    if stim_count > 0 {
        println!("  Stimulus channels: {}", stim_count);
    }
    if other_count > 0 {
        println!("  Other channels: {}", other_count);
    }
    println!();

    // Show first 10 channels
    println!("First 10 Channels:");
    for (i, ch) in meas_info.channels.iter().take(10).enumerate() {
        println!(
            "  {}: {} ({}) - cal={:.2e}, range={:.2e}",
            i,
            ch.ch_name,
            ch.type_name(),
            ch.cal,
            ch.range
        );
    }

    if meas_info.channels.len() > 10 {
        println!("  ... and {} more channels", meas_info.channels.len() - 10);
    }
    println!();

    let mut raw = match open_raw(path) {
        Ok(raw) => raw,
        Err(e) => {
            println!("No raw data: {}", e);
            return Ok(());
        }
    };
    println!(
        "Raw data: samples {}..={} in {} buffers",
        raw.first_samp(),
        raw.last_samp(),
        raw.buffers().len()
    );

    let seconds = (raw.n_samples() as f64 / raw.sfreq()).min(1.0);
    if seconds > 0.0 {
        let data = raw.read_times(0.0, seconds)?;
        for (ch, row) in meas_info.channels.iter().zip(&data).take(5) {
            let peak = row.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            println!("  {}: {} samples, peak {:.3e}", ch.ch_name, row.len(), peak);
        }
    }

    Ok(())
}
