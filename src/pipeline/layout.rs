//! Course layout: turn a [`Course`] into a flow of blocks, then flow the
//! blocks onto fixed-size pages.
//!
//! Two steps, both pure:
//!
//! ```text
//! Course ──▶ build_flow ──▶ Vec<LayoutBlock> ──▶ paginate ──▶ Vec<PageLayout>
//! ```
//!
//! The flow is the stable, inspectable contract (what gets printed, in what
//! order). Pagination decides where each line lands and knows nothing about
//! courses.

use crate::config::LayoutConfig;
use crate::course::Course;
use crate::pipeline::fonts::{text_width, Font};

/// An RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// Parse `#rrggbb`.
    pub const fn hex(value: u32) -> Rgb {
        Rgb(
            ((value >> 16) & 0xFF) as f32 / 255.0,
            ((value >> 8) & 0xFF) as f32 / 255.0,
            (value & 0xFF) as f32 / 255.0,
        )
    }
}

/// Title accent colour (#004576).
pub const TITLE_COLOR: Rgb = Rgb::hex(0x004576);
/// Unit heading accent colour (#e61853).
pub const UNIT_COLOR: Rgb = Rgb::hex(0xE61853);

/// 1 cm in PDF points.
pub const CM: f32 = 72.0 / 2.54;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Justify,
}

/// Paragraph styles used by the course flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStyle {
    Title,
    LevelHeading,
    UnitHeading,
    SubHeading,
    Body,
    Objective,
    QuizItem,
}

/// Resolved typographic parameters of a [`BlockStyle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleParams {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub left_indent: f32,
    pub align: Align,
    pub color: Rgb,
}

impl BlockStyle {
    pub fn params(self) -> StyleParams {
        let base = StyleParams {
            font: Font::Regular,
            size: 10.0,
            leading: 12.0,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
            align: Align::Left,
            color: Rgb::BLACK,
        };
        match self {
            BlockStyle::Title => StyleParams {
                font: Font::Bold,
                size: 24.0,
                leading: 28.0,
                space_after: 20.0,
                align: Align::Center,
                color: TITLE_COLOR,
                ..base
            },
            BlockStyle::LevelHeading => StyleParams {
                font: Font::Bold,
                size: 14.0,
                leading: 17.0,
                space_before: 12.0,
                space_after: 6.0,
                ..base
            },
            BlockStyle::UnitHeading => StyleParams {
                font: Font::Bold,
                size: 18.0,
                leading: 22.0,
                space_before: 15.0,
                space_after: 10.0,
                color: UNIT_COLOR,
                ..base
            },
            BlockStyle::SubHeading => StyleParams {
                font: Font::Bold,
                size: 12.0,
                leading: 14.0,
                space_before: 12.0,
                space_after: 6.0,
                ..base
            },
            BlockStyle::Body => StyleParams {
                size: 11.0,
                leading: 14.0,
                space_after: 10.0,
                align: Align::Justify,
                ..base
            },
            BlockStyle::Objective => StyleParams {
                space_after: 5.0,
                left_indent: 20.0,
                ..base
            },
            BlockStyle::QuizItem => StyleParams {
                font: Font::Oblique,
                ..base
            },
        }
    }
}

/// One element of the document flow.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    Paragraph { style: BlockStyle, text: String },
    /// Vertical gap in points.
    Spacer(f32),
    PageBreak,
}

impl LayoutBlock {
    fn paragraph(style: BlockStyle, text: impl Into<String>) -> Self {
        LayoutBlock::Paragraph {
            style,
            text: text.into(),
        }
    }

    /// Paragraph text, if this block is a paragraph.
    pub fn text(&self) -> Option<&str> {
        match self {
            LayoutBlock::Paragraph { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Build the block flow for a course.
///
/// Front matter (title, level, description) is followed by a page break;
/// every unit then gets its heading, objectives, content paragraphs and quiz
/// prompts, and ends with its own page break. Blank content lines are
/// dropped. Quiz choices and explanations are not printed.
pub fn build_flow(course: &Course) -> Vec<LayoutBlock> {
    let mut flow = vec![
        LayoutBlock::paragraph(BlockStyle::Title, course.title.as_str()),
        LayoutBlock::paragraph(
            BlockStyle::LevelHeading,
            format!("Adaptive Level: {}", course.level),
        ),
        LayoutBlock::paragraph(BlockStyle::Body, course.description.as_str()),
        LayoutBlock::PageBreak,
    ];

    for (idx, unit) in course.units.iter().enumerate() {
        flow.push(LayoutBlock::paragraph(
            BlockStyle::UnitHeading,
            format!("Unit {}: {}", idx + 1, unit.title),
        ));
        flow.push(LayoutBlock::paragraph(BlockStyle::SubHeading, "Objectives:"));
        for objective in &unit.objectives {
            flow.push(LayoutBlock::paragraph(
                BlockStyle::Objective,
                format!("- {objective}"),
            ));
        }

        flow.push(LayoutBlock::Spacer(0.5 * CM));
        for line in unit.content.split('\n') {
            if !line.trim().is_empty() {
                flow.push(LayoutBlock::paragraph(BlockStyle::Body, line.trim_end()));
            }
        }

        flow.push(LayoutBlock::Spacer(0.5 * CM));
        flow.push(LayoutBlock::paragraph(BlockStyle::SubHeading, "Review Quiz"));
        for q in &unit.quiz_questions {
            flow.push(LayoutBlock::paragraph(
                BlockStyle::QuizItem,
                format!("Q: {}", q.question),
            ));
            flow.push(LayoutBlock::Spacer(0.1 * CM));
        }

        flow.push(LayoutBlock::PageBreak);
    }

    flow
}

// ── Pagination ───────────────────────────────────────────────────────────

/// A single line of text placed on a page. Coordinates are PDF user space
/// (origin bottom-left), `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub color: Rgb,
    /// Extra space added to each ASCII space (PDF `Tw`), for justification.
    pub word_spacing: f32,
}

/// All lines on one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

struct Flow<'a> {
    config: &'a LayoutConfig,
    pages: Vec<PageLayout>,
    current: PageLayout,
    /// Distance of the cursor below the top of the frame.
    used: f32,
}

impl<'a> Flow<'a> {
    fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: PageLayout::default(),
            used: 0.0,
        }
    }

    fn at_top(&self) -> bool {
        self.used == 0.0
    }

    fn remaining(&self) -> f32 {
        self.config.frame_height() - self.used
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.used = 0.0;
    }

    fn page_break(&mut self) {
        if !self.current.lines.is_empty() {
            self.new_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        if self.at_top() {
            return;
        }
        if height >= self.remaining() {
            self.new_page();
        } else {
            self.used += height;
        }
    }

    fn paragraph(&mut self, style: BlockStyle, text: &str) {
        let params = style.params();
        let avail = self.config.frame_width() - params.left_indent;
        let lines = wrap_text(text, params.font, params.size, avail);

        if !self.at_top() {
            self.used += params.space_before;
        }

        let last = lines.len().saturating_sub(1);
        for (i, line) in lines.into_iter().enumerate() {
            if params.leading > self.remaining() && !self.at_top() {
                self.new_page();
            }
            self.used += params.leading;

            let width = text_width(&line, params.font, params.size);
            let left = self.config.margin + params.left_indent;
            let (x, word_spacing) = match params.align {
                Align::Left => (left, 0.0),
                Align::Center => (left + ((avail - width) / 2.0).max(0.0), 0.0),
                Align::Justify => {
                    let gaps = line.matches(' ').count();
                    if i < last && gaps > 0 && width < avail {
                        (left, (avail - width) / gaps as f32)
                    } else {
                        (left, 0.0)
                    }
                }
            };

            // Baseline sits a little above the bottom of the line box.
            let y = self.config.page_height - self.config.margin - self.used
                + (params.leading - params.size) / 2.0
                + params.size * 0.2;

            self.current.lines.push(PlacedLine {
                x,
                y,
                text: line,
                font: params.font,
                size: params.size,
                color: params.color,
                word_spacing,
            });
        }

        if params.space_after < self.remaining() {
            self.used += params.space_after;
        } else {
            self.new_page();
        }
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.lines.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

/// Flow blocks onto pages.
///
/// Paragraphs that do not fit continue on the next page line by line.
/// Page breaks on an empty page, and spacers at the top of a page, are
/// ignored, so the trailing break after the last unit never produces a blank
/// page. At least one page is always returned.
pub fn paginate(blocks: &[LayoutBlock], config: &LayoutConfig) -> Vec<PageLayout> {
    let mut flow = Flow::new(config);
    for block in blocks {
        match block {
            LayoutBlock::Paragraph { style, text } => flow.paragraph(*style, text),
            LayoutBlock::Spacer(h) => flow.spacer(*h),
            LayoutBlock::PageBreak => flow.page_break(),
        }
    }
    flow.finish()
}

/// Greedy word wrap. Words wider than the line are split by character.
/// Empty text yields one empty line so the paragraph still takes up space.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_width = text_width(word, font, size);

        if word_width > max_width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            for ch in word.chars() {
                let w = text_width(ch.encode_utf8(&mut [0; 4]), font, size);
                if line_width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line.push(ch);
                line_width += w;
            }
            continue;
        }

        if line.is_empty() {
            line.push_str(word);
            line_width = word_width;
        } else if line_width + space + word_width <= max_width {
            line.push(' ');
            line.push_str(word);
            line_width += space + word_width;
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_width = word_width;
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::sample_course;

    fn paragraphs(flow: &[LayoutBlock], style: BlockStyle) -> Vec<&str> {
        flow.iter()
            .filter_map(|b| match b {
                LayoutBlock::Paragraph { style: s, text } if *s == style => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_course_has_only_front_matter() {
        let course = sample_course(0);
        let flow = build_flow(&course);
        assert_eq!(flow.len(), 4);
        assert_eq!(flow[0].text(), Some("Cognitive Science 101"));
        assert_eq!(flow[1].text(), Some("Adaptive Level: Intermediate"));
        assert_eq!(flow[2].text(), Some("A compact tour of attention and memory."));
        assert_eq!(flow[3], LayoutBlock::PageBreak);
    }

    #[test]
    fn blank_content_lines_are_dropped() {
        let mut course = sample_course(1);
        course.units[0].content = "Line one\n\nLine two".into();
        let flow = build_flow(&course);
        let body = paragraphs(&flow, BlockStyle::Body);
        // description + two content lines
        assert_eq!(body, vec![course.description.as_str(), "Line one", "Line two"]);
    }

    #[test]
    fn unit_section_order() {
        let course = sample_course(2);
        let flow = build_flow(&course);
        let texts: Vec<&str> = flow[4..].iter().filter_map(LayoutBlock::text).collect();
        assert_eq!(
            &texts[..8],
            &[
                "Unit 1: Topic 1",
                "Objectives:",
                "- Explain topic 1",
                "- Apply it",
                "Opening paragraph 1.",
                "Second paragraph 1.",
                "Review Quiz",
                "Q: What is topic 1?",
            ]
        );
        let breaks = flow.iter().filter(|b| **b == LayoutBlock::PageBreak).count();
        assert_eq!(breaks, 3);
        assert_eq!(flow.last(), Some(&LayoutBlock::PageBreak));
    }

    #[test]
    fn choices_are_not_printed() {
        let flow = build_flow(&sample_course(1));
        assert!(flow
            .iter()
            .filter_map(LayoutBlock::text)
            .all(|t| !t.contains("Because B.") && t != "A"));
    }

    #[test]
    fn flow_is_deterministic() {
        let course = sample_course(3);
        assert_eq!(build_flow(&course), build_flow(&course));
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_text(&text, Font::Regular, 11.0, 200.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 11.0) <= 200.0, "{line}");
        }
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn wrap_splits_long_words() {
        let word = "x".repeat(100);
        let lines = wrap_text(&word, Font::Regular, 11.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn wrap_empty_text() {
        assert_eq!(wrap_text("", Font::Regular, 11.0, 100.0), vec![String::new()]);
    }

    #[test]
    fn one_page_per_unit_plus_cover() {
        let config = LayoutConfig::default();
        let pages = paginate(&build_flow(&sample_course(3)), &config);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[1].lines[0].text, "Unit 1: Topic 1");
    }

    #[test]
    fn empty_course_is_one_page() {
        let pages = paginate(&build_flow(&sample_course(0)), &LayoutConfig::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines[0].text, "Cognitive Science 101");
    }

    #[test]
    fn long_content_spills_over_within_margins() {
        let mut course = sample_course(1);
        course.units[0].content = "A sentence that fills some room on the page.\n".repeat(200);
        let config = LayoutConfig::default();
        let pages = paginate(&build_flow(&course), &config);
        assert!(pages.len() > 2);
        for page in &pages {
            for line in &page.lines {
                assert!(line.y >= config.margin, "line below bottom margin");
                assert!(line.y <= config.page_height - config.margin);
                assert!(line.x >= config.margin);
            }
        }
    }

    #[test]
    fn title_is_centered_and_colored() {
        let pages = paginate(&build_flow(&sample_course(0)), &LayoutConfig::default());
        let title = &pages[0].lines[0];
        assert!(title.x > LayoutConfig::default().margin);
        assert_eq!(title.color, TITLE_COLOR);
        assert_eq!(title.font, Font::Bold);
    }

    #[test]
    fn body_lines_are_justified_except_the_last() {
        let mut course = sample_course(1);
        course.units[0].content = "word ".repeat(120);
        let pages = paginate(&build_flow(&course), &LayoutConfig::default());
        let body: Vec<&PlacedLine> = pages[1]
            .lines
            .iter()
            .filter(|l| l.text.starts_with("word"))
            .collect();
        assert!(body.len() > 2);
        assert!(body[0].word_spacing > 0.0);
        assert_eq!(body.last().unwrap().word_spacing, 0.0);
    }

    /// Where a line's last glyph ends once `Tw` is applied to every space.
    fn drawn_end(line: &PlacedLine) -> f32 {
        let gaps = line.text.matches(' ').count() as f32;
        line.x + text_width(&line.text, line.font, line.size) + line.word_spacing * gaps
    }

    #[test]
    fn justified_french_lines_reach_the_right_margin() {
        let mut course = sample_course(1);
        course.units[0].content = "L’élève naïf apprend par cœur l’œuvre d’aujourd’hui, \
             c’est-à-dire l’île où l’on reçoit. "
            .repeat(8);
        let config = LayoutConfig::default();
        let right = config.page_width - config.margin;
        let pages = paginate(&build_flow(&course), &config);

        let justified: Vec<&PlacedLine> = pages[1]
            .lines
            .iter()
            .filter(|l| l.font == Font::Regular && l.word_spacing > 0.0)
            .collect();
        assert!(justified.len() > 2);
        for line in justified {
            let end = drawn_end(line);
            assert!((end - right).abs() < 0.5, "{} ends at {end}", line.text);
        }
    }

    #[test]
    fn wide_glyphs_stay_inside_the_frame() {
        let mut course = sample_course(1);
        course.units[0].content = "—".repeat(200);
        let config = LayoutConfig::default();
        let right = config.page_width - config.margin;
        let pages = paginate(&build_flow(&course), &config);

        let dashes: Vec<&PlacedLine> = pages[1]
            .lines
            .iter()
            .filter(|l| l.text.starts_with('—'))
            .collect();
        assert!(dashes.len() > 1);
        for line in dashes {
            assert!(drawn_end(line) <= right + 0.01, "{}", drawn_end(line));
        }
    }
}
