//! Raster rendering for the wall display: an 800×600 arrival board with an
//! optional weather strip, saved as PNG for an e-ink/LCD panel.
//!
//! Asset failures degrade, never abort: with no usable font the board keeps
//! its geometric layout without text, and a missing weather icon is skipped.

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Local};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use tracing::warn;

use crate::extract::ArrivalEstimate;
use crate::weather::WeatherSummary;

const BG_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
// G train line green
const BADGE_COLOR: Rgba<u8> = Rgba([131, 190, 82, 255]);
const BADGE_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SEPARATOR_COLOR: Rgba<u8> = Rgba([230, 230, 230, 255]);
const FOOTER_BG: Rgba<u8> = Rgba([80, 80, 80, 255]);
const FOOTER_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TIME_BAR_BG: Rgba<u8> = Rgba([25, 25, 25, 255]);
const GUIDE_LINE: Rgba<u8> = Rgba([145, 145, 145, 255]);

const FOOTER_HEIGHT: u32 = 250;
const TIME_BAR_HEIGHT: u32 = 50;
const SEPARATOR_THICKNESS: u32 = 4;
const EDGE_MARGIN: i32 = 20;
const ICON_SIZE: u32 = 30;
const HOURLY_ICON_SIZE: u32 = 28;

/// Renderer-level options, surfaced as CLI flags.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Rotate 90° counter-clockwise for portrait-mounted panels.
    pub rotate: bool,
    /// Collapse to 8-bit luma for grayscale e-ink panels.
    pub grayscale: bool,
    /// Directory of `<icon-key>.png` weather icons.
    pub icon_dir: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            rotate: false,
            grayscale: false,
            icon_dir: PathBuf::from("icons"),
        }
    }
}

/// Regular and bold display faces.
pub struct Fonts {
    pub regular: FontArc,
    pub bold: FontArc,
}

const FONT_CANDIDATES: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
    ),
];

impl Fonts {
    /// Resolves display faces from `FONT_PATH`/`FONT_PATH_BOLD` or common
    /// system font locations, reusing the regular face when no bold file
    /// exists. `None` means no usable font anywhere; callers render the
    /// board without text rather than failing the run.
    pub fn load() -> Option<Self> {
        if let Ok(path) = std::env::var("FONT_PATH") {
            if let Some(regular) = load_font(Path::new(&path)) {
                let bold = std::env::var("FONT_PATH_BOLD")
                    .ok()
                    .and_then(|p| load_font(Path::new(&p)))
                    .unwrap_or_else(|| regular.clone());
                return Some(Fonts { regular, bold });
            }
            warn!(path, "FONT_PATH did not load, trying system fonts");
        }

        for (regular_path, bold_path) in FONT_CANDIDATES {
            if let Some(regular) = load_font(Path::new(regular_path)) {
                let bold = load_font(Path::new(bold_path)).unwrap_or_else(|| regular.clone());
                return Some(Fonts { regular, bold });
            }
        }
        None
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let data = std::fs::read(path).ok()?;
    FontArc::try_from_vec(data).ok()
}

/// Composes the board image: arrival rows on top, footer with weather strip
/// and clock bar below, then the rotate/grayscale post-processing flags.
pub fn render_board(
    arrivals: &[ArrivalEstimate],
    badge: &str,
    weather: Option<&WeatherSummary>,
    now: DateTime<Local>,
    fonts: Option<&Fonts>,
    options: &RenderOptions,
) -> DynamicImage {
    let width = options.width.max(1);
    let height = options.height.max(1);
    let mut img = RgbaImage::from_pixel(width, height, BG_COLOR);

    let footer_height = FOOTER_HEIGHT.min(height / 2);
    let rows_bottom = height - footer_height;

    draw_arrival_rows(&mut img, arrivals, badge, fonts, width, rows_bottom);
    draw_footer(&mut img, weather, now, fonts, options, width, height, rows_bottom);

    let img = if options.rotate {
        imageops::rotate270(&img)
    } else {
        img
    };
    if options.grayscale {
        DynamicImage::ImageLuma8(imageops::grayscale(&img))
    } else {
        DynamicImage::ImageRgba8(img)
    }
}

fn draw_arrival_rows(
    img: &mut RgbaImage,
    arrivals: &[ArrivalEstimate],
    badge: &str,
    fonts: Option<&Fonts>,
    width: u32,
    rows_bottom: u32,
) {
    if arrivals.is_empty() {
        if let Some(fonts) = fonts {
            draw_centered(
                img,
                &fonts.bold,
                40.0,
                TEXT_COLOR,
                width as i32 / 2,
                rows_bottom as i32 / 2,
                "No trains",
            );
        }
        return;
    }

    let row_height = rows_bottom / arrivals.len() as u32;

    for (idx, estimate) in arrivals.iter().enumerate() {
        let top = idx as u32 * row_height;
        let center_y = (top + row_height / 2) as i32;

        draw_filled_circle_mut(img, (70, center_y), 32, BADGE_COLOR);

        if let Some(fonts) = fonts {
            draw_centered(img, &fonts.bold, 52.0, BADGE_TEXT, 70, center_y, badge);

            draw_text_mut(
                img,
                TEXT_COLOR,
                140,
                center_y - 25,
                PxScale::from(50.0),
                &fonts.bold,
                &estimate.direction,
            );

            if estimate.minutes_away > 0 {
                let figure = estimate.minutes_away.to_string();
                let figure_x = width as i32 - 62;
                draw_centered(img, &fonts.bold, 60.0, TEXT_COLOR, figure_x, center_y - 8, &figure);
                draw_centered(img, &fonts.regular, 22.0, TEXT_COLOR, figure_x, center_y + 28, "MIN");
            } else {
                draw_centered(
                    img,
                    &fonts.bold,
                    48.0,
                    TEXT_COLOR,
                    width as i32 - 85,
                    center_y,
                    "Now",
                );
            }
        }

        // Separator at the row boundary, skipped after the last row.
        if idx + 1 < arrivals.len() {
            let boundary = (idx as u32 + 1) * row_height;
            draw_filled_rect_mut(
                img,
                Rect::at(0, boundary as i32 - SEPARATOR_THICKNESS as i32 / 2)
                    .of_size(width, SEPARATOR_THICKNESS),
                SEPARATOR_COLOR,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_footer(
    img: &mut RgbaImage,
    weather: Option<&WeatherSummary>,
    now: DateTime<Local>,
    fonts: Option<&Fonts>,
    options: &RenderOptions,
    width: u32,
    height: u32,
    rows_bottom: u32,
) {
    draw_filled_rect_mut(
        img,
        Rect::at(0, rows_bottom as i32).of_size(width, height - rows_bottom),
        FOOTER_BG,
    );

    let time_bar_top = height.saturating_sub(TIME_BAR_HEIGHT);
    draw_filled_rect_mut(
        img,
        Rect::at(0, time_bar_top as i32).of_size(width, height - time_bar_top),
        TIME_BAR_BG,
    );

    if let Some(fonts) = fonts {
        let clock = now.format("%-I:%M %p").to_string();
        draw_text_mut(
            img,
            FOOTER_TEXT,
            EDGE_MARGIN,
            time_bar_top as i32 + 14,
            PxScale::from(22.0),
            &fonts.bold,
            &clock,
        );
    }

    if let Some(weather) = weather {
        draw_weather_strip(img, weather, fonts, options, width, height, rows_bottom);
    }
}

fn draw_weather_strip(
    img: &mut RgbaImage,
    weather: &WeatherSummary,
    fonts: Option<&Fonts>,
    options: &RenderOptions,
    width: u32,
    height: u32,
    rows_bottom: u32,
) {
    // Current condition, top-left of the footer.
    let mut condition_x = EDGE_MARGIN;
    if let Some(icon) = load_icon(&options.icon_dir.join(format!("{}.png", weather.condition_icon)), ICON_SIZE)
    {
        imageops::overlay(img, &icon, condition_x as i64, rows_bottom as i64 + 10);
        condition_x += ICON_SIZE as i32 + 8;
    }
    if let Some(fonts) = fonts {
        draw_text_mut(
            img,
            FOOTER_TEXT,
            condition_x,
            rows_bottom as i32 + 14,
            PxScale::from(22.0),
            &fonts.bold,
            &weather.temperature_text,
        );
    }

    // Next sun event, bottom-right of the time bar.
    let time_bar_top = height.saturating_sub(TIME_BAR_HEIGHT) as i32;
    let label_width = fonts
        .map(|f| text_size(PxScale::from(22.0), &f.bold, &weather.sun_event_label).0 as i32)
        .unwrap_or(0);
    let sun_x = width as i32 - EDGE_MARGIN - label_width - 8 - ICON_SIZE as i32;
    if let Some(icon) = load_icon(&options.icon_dir.join(format!("{}.png", weather.sun_event_icon)), ICON_SIZE)
    {
        imageops::overlay(img, &icon, sun_x as i64, (time_bar_top + 10) as i64);
    }
    if let Some(fonts) = fonts {
        draw_text_mut(
            img,
            FOOTER_TEXT,
            sun_x + ICON_SIZE as i32 + 8,
            time_bar_top + 14,
            PxScale::from(22.0),
            &fonts.bold,
            &weather.sun_event_label,
        );
    }

    if weather.hourly.is_empty() {
        return;
    }

    // Hourly columns: temperature plotted by value in a band, icon and time
    // label fixed below, a vertical guide line tying each column together.
    let columns = weather.hourly.len() as i32;
    let usable = width as i32 - 2 * EDGE_MARGIN;
    let spacing = usable / columns;

    let temps: Vec<i64> = weather.hourly.iter().map(|h| h.temperature).collect();
    let min_temp = temps.iter().min().copied().unwrap_or(0);
    let max_temp = temps.iter().max().copied().unwrap_or(0);
    let temp_range = (max_temp - min_temp).max(1) as f32;

    let graph_top = rows_bottom as i32 + 50;
    let graph_bottom = height as i32 - 165;
    let icon_y = height as i32 - 120;
    let label_y = height as i32 - 76;

    for (i, hour) in weather.hourly.iter().enumerate() {
        let x = EDGE_MARGIN + i as i32 * spacing + spacing / 2;

        if let Some(icon) = load_icon(&options.icon_dir.join(format!("{}.png", hour.icon)), HOURLY_ICON_SIZE)
        {
            imageops::overlay(
                img,
                &icon,
                (x - HOURLY_ICON_SIZE as i32 / 2) as i64,
                icon_y as i64,
            );
        }

        let normalized = if max_temp > min_temp {
            (hour.temperature - min_temp) as f32 / temp_range
        } else {
            0.5
        };
        let temp_y = graph_bottom - (normalized * (graph_bottom - graph_top) as f32) as i32;

        if let Some(fonts) = fonts {
            draw_centered(img, &fonts.regular, 18.0, FOOTER_TEXT, x, label_y, &hour.label);
            draw_centered(
                img,
                &fonts.bold,
                24.0,
                FOOTER_TEXT,
                x,
                temp_y,
                &format!("{}°", hour.temperature),
            );
        }

        draw_line_segment_mut(
            img,
            (x as f32, (temp_y + 16) as f32),
            (x as f32, (icon_y - 5) as f32),
            GUIDE_LINE,
        );
    }
}

fn draw_centered(
    img: &mut RgbaImage,
    font: &FontArc,
    size: f32,
    color: Rgba<u8>,
    cx: i32,
    cy: i32,
    text: &str,
) {
    let scale = PxScale::from(size);
    let (w, h) = text_size(scale, font, text);
    draw_text_mut(img, color, cx - w as i32 / 2, cy - h as i32 / 2, scale, font, text);
}

fn load_icon(path: &Path, size: u32) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(icon) => Some(imageops::resize(
            &icon.to_rgba8(),
            size,
            size,
            FilterType::Lanczos3,
        )),
        Err(error) => {
            warn!(path = %path.display(), %error, "Icon unavailable, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::GenericImageView;

    fn estimate(minutes: i64, direction: &str) -> ArrivalEstimate {
        ArrivalEstimate {
            minutes_away: minutes,
            trip_id: String::new(),
            direction: direction.to_string(),
        }
    }

    fn test_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn missing_assets() -> RenderOptions {
        RenderOptions {
            icon_dir: PathBuf::from("/nonexistent"),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_default_dimensions() {
        let arrivals = vec![estimate(3, "Court Square"), estimate(8, "Church Ave")];
        let img = render_board(&arrivals, "G", None, test_now(), None, &missing_assets());

        assert_eq!((img.width(), img.height()), (800, 600));
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let options = RenderOptions {
            rotate: true,
            ..missing_assets()
        };
        let img = render_board(&[], "G", None, test_now(), None, &options);

        assert_eq!((img.width(), img.height()), (600, 800));
    }

    #[test]
    fn test_grayscale_collapses_to_luma() {
        let options = RenderOptions {
            grayscale: true,
            ..missing_assets()
        };
        let img = render_board(&[], "G", None, test_now(), None, &options);

        assert_eq!(img.color(), image::ColorType::L8);
    }

    #[test]
    fn test_badge_disc_is_painted() {
        // One row: disc centered at (70, 175) in the 350px row area
        let arrivals = vec![estimate(3, "Court Square")];
        let img = render_board(&arrivals, "G", None, test_now(), None, &missing_assets());

        assert_eq!(*img.to_rgba8().get_pixel(70, 175), BADGE_COLOR);
    }

    #[test]
    fn test_empty_board_still_renders() {
        let img = render_board(&[], "G", None, test_now(), None, &missing_assets());

        // Footer band is painted even with nothing to show
        assert_eq!(*img.to_rgba8().get_pixel(400, 580), TIME_BAR_BG);
        assert_eq!(*img.to_rgba8().get_pixel(400, 100), BG_COLOR);
    }

    #[test]
    fn test_weather_strip_without_assets_does_not_panic() {
        let now = test_now();
        let weather = WeatherSummary {
            temperature_text: "74°F Sunny".to_string(),
            condition_icon: "sunny".to_string(),
            sun_event_icon: "sunset".to_string(),
            sun_event_label: "8:12 PM".to_string(),
            hourly: (0..8)
                .map(|i| crate::weather::HourlyForecast {
                    label: format!("{} PM", i + 1),
                    temperature: 70 + i,
                    icon: "sunny".to_string(),
                    starts_at: now,
                })
                .collect(),
            sunrise: now,
            sunset: now,
        };

        let img = render_board(
            &[estimate(0, "Court Square")],
            "G",
            Some(&weather),
            now,
            None,
            &missing_assets(),
        );

        assert_eq!((img.width(), img.height()), (800, 600));
    }
}
