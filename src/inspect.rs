use crate::document::{BarFrame, DocumentHeader};

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One character per bar, eight shades plus blank.
pub fn render_bar_row(frame: &BarFrame) -> String {
    frame
        .as_slice()
        .iter()
        .map(|&v| LEVELS[(v as usize * 8 + 127) / 255])
        .collect()
}

pub fn header_summary(header: &DocumentHeader, frame_count: usize) -> Vec<String> {
    let mut lines = vec![
        format!("Num bars: {}", header.num_bars),
        format!("Sample rate: {} Hz", header.sample_rate),
        format!("Block size: {} samples", header.block_size),
        format!("Num blocks: {}", frame_count),
        format!(
            "Frame duration: {:.2} ms ({:.1}s total)",
            header.seconds_per_frame() * 1000.0,
            frame_count as f64 * header.seconds_per_frame()
        ),
    ];
    match header.max_spectral_energy {
        Some(energy) => lines.push(format!("Max spectral energy: {:.6e}", energy)),
        None => lines.push("Max spectral energy: (not recorded)".to_string()),
    }
    lines
}
