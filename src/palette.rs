//! Color allocation for package visual identity.
//!
//! Presentation concern only: geometry never reads these colors. Each active
//! package holds one color; deleting returns it to the pool, restoring takes a
//! new one. Once the fixed palette is exhausted, fallback colors are generated
//! by walking the hue circle in golden-angle steps, shifting saturation and
//! lightness on every pass. If no unused color turns up within a bounded number
//! of candidates, a color is shared; sharing is counted so releases stay exact.

use std::collections::HashMap;

use crate::model::PackageId;

/// Default palette, handed out in this order.
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac", "#1f77b4", "#2ca02c",
];

const GOLDEN_ANGLE_DEGREES: f64 = 137.507_764;
/// Generated hues per saturation/lightness pass.
const HUES_PER_PASS: u64 = 256;
const PASS_SATURATION: [f64; 3] = [0.55, 0.75, 0.4];
const PASS_LIGHTNESS: [f64; 5] = [0.55, 0.45, 0.65, 0.38, 0.72];
/// Candidates tried before an in-use color is handed out again.
const MAX_GENERATION_ATTEMPTS: u32 = 1024;

/// Free-list allocator over a fixed palette with generated overflow colors.
#[derive(Clone, Debug)]
pub struct ColorAllocator {
    palette: Vec<String>,
    assigned: HashMap<PackageId, String>,
    /// Number of packages holding each color.
    in_use: HashMap<String, usize>,
    generated: u64,
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl ColorAllocator {
    pub fn new(palette: Vec<String>) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
            in_use: HashMap::new(),
            generated: 0,
        }
    }

    /// Returns the color held by `id`, assigning a free one first if needed.
    pub fn acquire(&mut self, id: PackageId) -> String {
        if let Some(color) = self.assigned.get(&id) {
            return color.clone();
        }

        let color = match self.palette.iter().find(|c| !self.in_use.contains_key(*c)) {
            Some(color) => color.clone(),
            None => self.next_generated(),
        };
        *self.in_use.entry(color.clone()).or_insert(0) += 1;
        self.assigned.insert(id, color.clone());
        color
    }

    /// Returns the color of `id` to the pool.
    pub fn release(&mut self, id: PackageId) {
        let Some(color) = self.assigned.remove(&id) else {
            return;
        };
        if let Some(holders) = self.in_use.get_mut(&color) {
            *holders -= 1;
            if *holders == 0 {
                self.in_use.remove(&color);
            }
        }
    }

    pub fn release_all(&mut self) {
        self.assigned.clear();
        self.in_use.clear();
    }

    pub fn color_of(&self, id: PackageId) -> Option<&str> {
        self.assigned.get(&id).map(String::as_str)
    }

    fn next_generated(&mut self) -> String {
        let mut attempts = 0;
        loop {
            let candidate = generated_color(self.generated);
            self.generated = self.generated.wrapping_add(1);
            attempts += 1;
            if !self.in_use.contains_key(&candidate) || attempts >= MAX_GENERATION_ATTEMPTS {
                return candidate;
            }
        }
    }
}

/// Fallback color number `index`: golden-angle hue, pass-dependent saturation and lightness.
fn generated_color(index: u64) -> String {
    let hue = (index as f64 * GOLDEN_ANGLE_DEGREES) % 360.0;
    let pass = (index / HUES_PER_PASS) as usize;
    let saturation = PASS_SATURATION[pass % PASS_SATURATION.len()];
    let lightness = PASS_LIGHTNESS[(pass / PASS_SATURATION.len()) % PASS_LIGHTNESS.len()];
    hsl_to_hex(hue, saturation, lightness)
}

/// Converts an HSL color (hue in degrees, saturation and lightness in `[0, 1]`) to `#rrggbb`.
fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}
