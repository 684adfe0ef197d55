use serde::{Deserialize, Serialize};

const DEFAULT_PALETTE: &[&str] = &[
    "#2563EB", "#16A34A", "#F59E0B", "#DC2626", "#7C3AED", "#0891B2", "#DB2777", "#65A30D",
];

/// Brand name and chart colours for one deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandStyle {
    pub name: Option<String>,
    pub palette: Vec<String>,
}

impl Default for BrandStyle {
    fn default() -> Self {
        Self {
            name: None,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl BrandStyle {
    /// Default palette, rotated by the brand name so each brand leads with
    /// its own colour.
    pub fn for_brand(brand: Option<&str>) -> Self {
        let Some(name) = brand.map(str::trim).filter(|b| !b.is_empty()) else {
            return Self::default();
        };

        let mut palette: Vec<String> = DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect();
        let offset = name.bytes().map(usize::from).sum::<usize>() % palette.len();
        palette.rotate_left(offset);

        Self {
            name: Some(name.to_string()),
            palette,
        }
    }

    pub fn with_palette(mut self, palette: Vec<String>) -> Self {
        if !palette.is_empty() {
            self.palette = palette;
        }
        self
    }

    pub fn color(&self, index: usize) -> String {
        match self.palette.len() {
            0 => DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()].to_string(),
            n => self.palette[index % n].clone(),
        }
    }

    pub fn colors(&self, count: usize) -> Vec<String> {
        (0..count).map(|i| self.color(i)).collect()
    }
}
