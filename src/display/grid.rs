//! Single-row image grid for the top search hits.
//!
//! An [`ImageGrid`] owns its panels outright: it can be composed into one
//! RGBA figure or shown in the terminal, with no shared drawing state.

use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};
use std::io::{self, Stdout, Write};
use std::path::Path;

use super::SearchHit;
use crate::config::ImageProtocol;
use crate::error::{Error, Result};
use crate::store::{fetch_image_decoded, ObjectStore};

/// One image with its caption
pub struct GridPanel {
    pub title: String,
    pub image: DynamicImage,
}

pub struct ImageGrid {
    panels: Vec<GridPanel>,
}

impl ImageGrid {
    pub fn new(panels: Vec<GridPanel>) -> Self {
        Self { panels }
    }

    /// Fetch and decode the image of each of the first `limit` hits.
    pub fn fetch(store: &dyn ObjectStore, results: &[SearchHit], limit: usize, size: &str) -> Result<Self> {
        let mut panels = Vec::with_capacity(limit.min(results.len()));

        for hit in results.iter().take(limit) {
            let key = hit
                .source
                .path
                .as_deref()
                .ok_or(Error::MissingField("_source.path"))?;

            panels.push(GridPanel {
                title: format!("ID: {}", hit.id),
                image: fetch_image_decoded(store, key, size)?,
            });
        }

        tracing::debug!(panels = panels.len(), "image grid fetched");
        Ok(Self { panels })
    }

    pub fn panels(&self) -> &[GridPanel] {
        &self.panels
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Compose the panels side by side on a white figure, each image fitted
    /// and centered in its own `panel_width` x `panel_height` cell. An empty
    /// grid composes to a single blank cell.
    ///
    /// Fails with [`Error::FigureTooLarge`] when the figure width or its pixel
    /// buffer size overflows.
    pub fn compose(&self, panel_width: u32, panel_height: u32) -> Result<RgbaImage> {
        let panel_width = panel_width.max(1);
        let panel_height = panel_height.max(1);
        let too_large = || Error::FigureTooLarge {
            panels: u32::try_from(self.panels.len()).unwrap_or(u32::MAX),
            panel_width,
            panel_height,
        };

        let columns = u32::try_from(self.panels.len().max(1)).map_err(|_| too_large())?;
        let figure_width = panel_width.checked_mul(columns).ok_or_else(too_large)?;
        (figure_width as usize)
            .checked_mul(panel_height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(too_large)?;

        let mut figure =
            RgbaImage::from_pixel(figure_width, panel_height, Rgba([255, 255, 255, 255]));

        for (i, panel) in self.panels.iter().enumerate() {
            let fitted = panel
                .image
                .resize(panel_width, panel_height, FilterType::Triangle)
                .to_rgba8();

            let x = i as u32 * panel_width + panel_width.saturating_sub(fitted.width()) / 2;
            let y = panel_height.saturating_sub(fitted.height()) / 2;
            imageops::replace(&mut figure, &fitted, x as i64, y as i64);
        }

        Ok(figure)
    }

    /// Compose and write the figure; the format follows the file extension.
    pub fn save(&self, path: &Path, panel_width: u32, panel_height: u32) -> Result<()> {
        self.compose(panel_width, panel_height)?
            .save(path)
            .map_err(Error::Encode)
    }
}

/// Split `area` into one equal column per panel.
pub fn panel_areas(area: Rect, count: usize) -> Vec<Rect> {
    match count {
        0 => Vec::new(),
        1 => vec![area],
        n => Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, n as u32); n])
            .split(area)
            .to_vec(),
    }
}

fn create_picker(protocol: ImageProtocol) -> Option<Picker> {
    match protocol {
        ImageProtocol::None => None,
        ImageProtocol::Halfblocks => Some(Picker::from_fontsize((8, 16))),
        ImageProtocol::Auto => Picker::from_query_stdio().ok(),
    }
}

/// Puts the terminal back the way it was found when dropped, however far
/// setup got.
struct TerminalGuard<W: Write> {
    out: W,
    raw_mode: bool,
    alternate_screen: bool,
}

impl<W: Write> TerminalGuard<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            raw_mode: false,
            alternate_screen: false,
        }
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.raw_mode = true;
        Ok(())
    }

    fn enter_alternate_screen(&mut self) -> io::Result<()> {
        execute!(self.out, EnterAlternateScreen)?;
        self.alternate_screen = true;
        Ok(())
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(self.out, LeaveAlternateScreen, cursor::Show);
        }
        if self.raw_mode {
            let _ = disable_raw_mode();
        }
    }
}

/// Show the grid in the terminal until a key is pressed.
pub fn show(grid: &ImageGrid, protocol: ImageProtocol) -> Result<()> {
    let mut guard = TerminalGuard::new(io::stdout());
    guard.enable_raw_mode()?;
    guard.enter_alternate_screen()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    // The picker queries the terminal, so it needs raw mode
    let mut picker = create_picker(protocol);
    let mut states: Vec<Option<StatefulProtocol>> = grid
        .panels
        .iter()
        .map(|panel| {
            picker
                .as_mut()
                .map(|picker| picker.new_resize_protocol(panel.image.clone()))
        })
        .collect();

    run_viewer(&mut terminal, grid, &mut states)
}

/// Fetch the first `limit` hits' images and show them in the terminal.
pub fn show_image_grid(
    store: &dyn ObjectStore,
    results: &[SearchHit],
    limit: usize,
    size: &str,
    protocol: ImageProtocol,
) -> Result<()> {
    let grid = ImageGrid::fetch(store, results, limit, size)?;
    show(&grid, protocol)
}

fn run_viewer(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    grid: &ImageGrid,
    states: &mut [Option<StatefulProtocol>],
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, grid, states))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

fn render(frame: &mut Frame, grid: &ImageGrid, states: &mut [Option<StatefulProtocol>]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let footer = Paragraph::new("Press any key to close")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, chunks[1]);

    if grid.is_empty() {
        let empty = Paragraph::new("No results")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, chunks[0]);
        return;
    }

    let areas = panel_areas(chunks[0], grid.len());
    for ((panel, state), area) in grid.panels.iter().zip(states.iter_mut()).zip(areas) {
        // Caption only, no axes or frame
        let block = Block::default()
            .borders(Borders::NONE)
            .title(panel.title.as_str())
            .title_alignment(Alignment::Center);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.width < 2 || inner.height < 2 {
            continue;
        }

        match state {
            Some(protocol) => {
                let image = StatefulImage::new(None).resize(Resize::Fit(None));
                frame.render_stateful_widget(image, inner, protocol);
            }
            None => {
                let placeholder = Paragraph::new(format!(
                    "[{}x{}]",
                    panel.image.width(),
                    panel.image.height()
                ))
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
                frame.render_widget(placeholder, inner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HitSource;
    use crate::store::LocalStore;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::tempdir;

    fn hit(id: &str, path: Option<&str>) -> SearchHit {
        SearchHit {
            score: 1.0,
            id: id.to_string(),
            source: HitSource {
                path: path.map(|p| p.to_string()),
                ..Default::default()
            },
        }
    }

    fn store_with_images(names: &[&str]) -> (tempfile::TempDir, LocalStore) {
        let dir = tempdir().unwrap();
        let small = dir.path().join("images/small");
        std::fs::create_dir_all(&small).unwrap();
        for name in names {
            RgbImage::from_pixel(40, 20, Rgb([0, 0, 255]))
                .save(small.join(name))
                .unwrap();
        }
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])))
    }

    #[test]
    fn test_fetch_truncates_and_captions() {
        let (_dir, store) = store_with_images(&["a.png", "b.png", "c.png", "d.png"]);
        let results: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| hit(id, Some(&format!("{}.png", id))))
            .collect();

        let grid = ImageGrid::fetch(&store, &results, 3, "small").unwrap();
        let titles: Vec<_> = grid.panels().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["ID: a", "ID: b", "ID: c"]);
        assert_eq!(grid.panels()[0].image.dimensions(), (40, 20));
    }

    #[test]
    fn test_single_result_grid() {
        let (dir, store) = store_with_images(&["only.png"]);
        let grid = ImageGrid::fetch(&store, &[hit("X1", Some("only.png"))], 3, "small").unwrap();
        assert_eq!(grid.len(), 1);

        let figure = grid.compose(300, 200).unwrap();
        assert_eq!(figure.dimensions(), (300, 200));
        // 40x20 scaled to 300x150, centered vertically
        let inside = figure.get_pixel(150, 100);
        assert!(inside[0] < 5 && inside[2] > 250);
        assert_eq!(figure.get_pixel(150, 10), &Rgba([255, 255, 255, 255]));

        let out = dir.path().join("grid.png");
        grid.save(&out, 300, 200).unwrap();
        assert_eq!(image::open(&out).unwrap().dimensions(), (300, 200));

        assert_eq!(panel_areas(Rect::new(0, 0, 90, 30), 1), vec![Rect::new(0, 0, 90, 30)]);
    }

    #[test]
    fn test_empty_grid() {
        let (_dir, store) = store_with_images(&[]);
        let grid = ImageGrid::fetch(&store, &[], 3, "small").unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.compose(300, 200).unwrap().dimensions(), (300, 200));

        let (_dir, store) = store_with_images(&["a.png"]);
        let limited = ImageGrid::fetch(&store, &[hit("a", Some("a.png"))], 0, "small").unwrap();
        assert!(limited.is_empty());

        assert!(panel_areas(Rect::new(0, 0, 90, 30), 0).is_empty());
    }

    #[test]
    fn test_compose_places_panels_side_by_side() {
        let grid = ImageGrid::new(vec![
            GridPanel { title: "ID: 1".to_string(), image: solid(10, 10) },
            GridPanel { title: "ID: 2".to_string(), image: solid(10, 10) },
            GridPanel { title: "ID: 3".to_string(), image: solid(10, 10) },
        ]);

        let figure = grid.compose(100, 50).unwrap();
        assert_eq!(figure.dimensions(), (300, 50));
        for center in [50, 150, 250] {
            assert_eq!(figure.get_pixel(center, 25), &Rgba([0, 0, 0, 255]));
        }
        // gaps beside the square images stay white
        assert_eq!(figure.get_pixel(5, 25), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_oversized_figure_is_an_error() {
        let grid = ImageGrid::new(vec![
            GridPanel { title: "ID: 1".to_string(), image: solid(1, 1) },
            GridPanel { title: "ID: 2".to_string(), image: solid(1, 1) },
            GridPanel { title: "ID: 3".to_string(), image: solid(1, 1) },
        ]);

        let err = grid.compose(u32::MAX / 2, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::FigureTooLarge { panels: 3, panel_height: 1, .. }
        ));

        let dir = tempdir().unwrap();
        let out = dir.path().join("huge.png");
        assert!(grid.save(&out, u32::MAX / 2, 1).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_terminal_guard_restores_screen() {
        let mut out = Vec::new();
        {
            let mut guard = TerminalGuard::new(&mut out);
            guard.enter_alternate_screen().unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let entered = text.find("\x1b[?1049h").unwrap();
        let left = text.find("\x1b[?1049l").unwrap();
        assert!(entered < left);
        assert!(text[left..].contains("\x1b[?25h"));
    }

    #[test]
    fn test_terminal_guard_untouched_terminal() {
        let mut out = Vec::new();
        drop(TerminalGuard::new(&mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn test_panel_areas_split_evenly() {
        let areas = panel_areas(Rect::new(0, 0, 90, 30), 3);
        assert_eq!(areas.len(), 3);
        assert!(areas.iter().all(|a| a.width == 30 && a.height == 30));
        assert_eq!(areas[2].x, 60);
    }

    #[test]
    fn test_hit_without_path() {
        let (_dir, store) = store_with_images(&[]);
        let err = ImageGrid::fetch(&store, &[hit("nopath", None)], 3, "small").err().unwrap();
        assert!(matches!(err, Error::MissingField("_source.path")));
    }

    #[test]
    fn test_missing_image_propagates() {
        let (_dir, store) = store_with_images(&[]);
        let err = ImageGrid::fetch(&store, &[hit("gone", Some("gone.png"))], 3, "small")
            .err()
            .unwrap();
        assert!(matches!(err, Error::ObjectNotFound(_)));
    }
}
