//! FFmpeg video filter chain builder.
//!
//! Pipeline code composes `FilterStage`s; the `-vf` syntax only exists in
//! `FilterStage::render`.

use std::path::{Path, PathBuf};

use vforge_models::{ProcessingOptions, Resolution};

/// Caption styling for burned-in subtitles (ASS `force_style` fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStyle {
    pub alignment: u8,
    pub font_size: u32,
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            alignment: 2,
            font_size: 24,
            primary_colour: "&Hffffff".to_string(),
            outline_colour: "&H000000".to_string(),
            outline: 2,
        }
    }
}

impl SubtitleStyle {
    fn force_style(&self) -> String {
        format!(
            "Alignment={},FontSize={},PrimaryColour={},OutlineColour={},Outline={}",
            self.alignment, self.font_size, self.primary_colour, self.outline_colour, self.outline
        )
    }
}

/// One stage of a `-vf` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStage {
    /// Scale down to fit inside the box, keeping aspect ratio
    ScaleToFit(Resolution),
    /// Pad to exactly the box, centred
    Pad(Resolution),
    /// Burn an SRT file into the frame
    Subtitles { path: PathBuf, style: SubtitleStyle },
}

impl FilterStage {
    pub fn render(&self) -> String {
        match self {
            FilterStage::ScaleToFit(res) => format!(
                "scale={}:{}:force_original_aspect_ratio=decrease",
                res.width, res.height
            ),
            FilterStage::Pad(res) => {
                format!("pad={}:{}:(ow-iw)/2:(oh-ih)/2", res.width, res.height)
            }
            FilterStage::Subtitles { path, style } => format!(
                "subtitles={}:force_style='{}'",
                escape_filter_path(path),
                style.force_style()
            ),
        }
    }
}

/// Ordered list of filter stages, serialized once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    stages: Vec<FilterStage>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for the requested output; empty when the source size is kept.
    pub fn for_output(options: &ProcessingOptions) -> Self {
        match options.target_resolution() {
            Some(res) => Self::new().fit_box(res),
            None => Self::new(),
        }
    }

    /// Fit inside the box, then pad to the exact box.
    pub fn fit_box(self, res: Resolution) -> Self {
        self.stage(FilterStage::ScaleToFit(res)).stage(FilterStage::Pad(res))
    }

    pub fn subtitles(self, path: impl AsRef<Path>, style: SubtitleStyle) -> Self {
        self.stage(FilterStage::Subtitles {
            path: path.as_ref().to_path_buf(),
            style,
        })
    }

    pub fn stage(mut self, stage: FilterStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The box the chain pads to, if any.
    pub fn output_box(&self) -> Option<Resolution> {
        self.stages.iter().rev().find_map(|stage| match stage {
            FilterStage::Pad(res) => Some(*res),
            _ => None,
        })
    }

    /// Serialize to a `-vf` argument; `None` for an empty chain.
    pub fn to_filter_string(&self) -> Option<String> {
        if self.stages.is_empty() {
            return None;
        }
        Some(
            self.stages
                .iter()
                .map(FilterStage::render)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

/// Escape a path for use as a filter option value inside a `-vf` graph.
///
/// Two levels apply: the filter's option parser (`:` `'` `\`) and then the
/// filtergraph parser (`,` `;` `[` `]` `'` `\`).
fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let option_level = escape_chars(&raw, &['\\', '\'', ':']);
    escape_chars(&option_level, &['\\', '\'', ',', ';', '[', ']'])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use vforge_models::{AspectRatio, Quality};

    fn options(aspect: AspectRatio, quality: Quality) -> ProcessingOptions {
        ProcessingOptions {
            output_aspect: aspect,
            quality,
            ..ProcessingOptions::default()
        }
    }

    #[test]
    fn test_portrait_high_chain() {
        let chain = FilterChain::for_output(&options(AspectRatio::Portrait, Quality::High));
        assert_eq!(
            chain.to_filter_string().unwrap(),
            "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2"
        );
        assert_eq!(chain.output_box(), Some(Resolution::new(1080, 1920)));
    }

    #[test]
    fn test_landscape_keeps_source_size() {
        let chain = FilterChain::for_output(&options(AspectRatio::Landscape, Quality::Low));
        assert!(chain.is_empty());
        assert_eq!(chain.to_filter_string(), None);
    }

    #[test]
    fn test_landscape_with_subtitles_has_no_leading_separator() {
        let chain = FilterChain::for_output(&options(AspectRatio::Landscape, Quality::High))
            .subtitles("/tmp/work/subtitles.srt", SubtitleStyle::default());
        let vf = chain.to_filter_string().unwrap();
        assert!(vf.starts_with("subtitles=/tmp/work/subtitles.srt:force_style='Alignment=2"));
    }

    #[test]
    fn test_subtitles_follow_geometry() {
        let chain = FilterChain::for_output(&options(AspectRatio::Square, Quality::Medium))
            .subtitles("/tmp/a.srt", SubtitleStyle::default());
        assert_eq!(chain.stages().len(), 3);
        assert!(matches!(chain.stages()[2], FilterStage::Subtitles { .. }));
        assert!(chain
            .to_filter_string()
            .unwrap()
            .contains("pad=720:720:(ow-iw)/2:(oh-ih)/2,subtitles="));
    }

    #[test]
    fn test_path_escaping() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\work\\it's,here.srt")),
            "C\\\\:/work/it\\\\\\'s\\,here.srt"
        );
    }

    #[test]
    fn test_work_dir_with_separators_stays_one_filter() {
        let chain = FilterChain::new().subtitles("/srv/a:b,c/subtitles.srt", SubtitleStyle::default());
        let vf = chain.to_filter_string().unwrap();
        assert!(vf.starts_with("subtitles=/srv/a\\\\:b\\,c/subtitles.srt:force_style="));
        let path_part = vf.split(":force_style=").next().unwrap();
        let unescaped_commas = path_part
            .match_indices(',')
            .filter(|(i, _)| !path_part[..*i].ends_with('\\'))
            .count();
        assert_eq!(unescaped_commas, 0);
    }
}
