//! Short-range forecast lookup for the board's weather strip.
//!
//! Two collaborators: the National Weather Service API (points lookup, then
//! the period forecast and hourly forecast it links to) and
//! api.sunrise-sunset.org for sun event times. Only the consumed shape is
//! modeled; any failure here degrades to a board without a weather strip.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Timelike};
use serde::Deserialize;
use tracing::debug;

use crate::config::WeatherConfig;
use crate::fetch::{HttpClient, fetch_json};

/// How many hourly periods the strip shows.
pub const HOURLY_PERIODS: usize = 12;

/// Periods starting this far in the past still count as the current hour.
const CURRENT_HOUR_SLACK_MINUTES: i64 = 30;

/// Everything the renderer consumes about the weather.
#[derive(Debug, Clone)]
pub struct WeatherSummary {
    /// E.g. `74°F P. Cloudy`.
    pub temperature_text: String,
    /// Icon key for the current condition, see [`icon_for_condition`].
    pub condition_icon: String,
    /// `sunrise` or `sunset`, whichever comes next.
    pub sun_event_icon: String,
    /// Clock label for the next sun event, e.g. `8:12 PM`.
    pub sun_event_label: String,
    pub hourly: Vec<HourlyForecast>,
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct HourlyForecast {
    /// `NOW` for the period covering the current hour, `3 PM` style otherwise.
    pub label: String,
    pub temperature: i64,
    pub icon: String,
    pub starts_at: DateTime<Local>,
}

#[derive(Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Deserialize)]
struct PointsProperties {
    forecast: String,
    #[serde(rename = "forecastHourly")]
    forecast_hourly: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Deserialize, Clone)]
struct ForecastPeriod {
    #[serde(rename = "startTime")]
    start_time: DateTime<FixedOffset>,
    temperature: i64,
    #[serde(rename = "shortForecast")]
    short_forecast: String,
    #[serde(rename = "isDaytime")]
    is_daytime: bool,
}

#[derive(Deserialize)]
struct SunResponse {
    results: SunResults,
}

#[derive(Deserialize)]
struct SunResults {
    sunrise: DateTime<FixedOffset>,
    sunset: DateTime<FixedOffset>,
}

/// Fetches and condenses the forecast around `now`.
#[tracing::instrument(skip(client, config), fields(lat = config.latitude, lon = config.longitude))]
pub async fn fetch_weather<C: HttpClient>(
    client: &C,
    config: &WeatherConfig,
    now: DateTime<Local>,
) -> Result<WeatherSummary> {
    let points: PointsResponse = fetch_json(client, &points_url(config)).await?;
    let forecast: ForecastResponse = fetch_json(client, &points.properties.forecast).await?;
    let hourly: ForecastResponse = fetch_json(client, &points.properties.forecast_hourly).await?;
    let sun: SunResponse = fetch_json(client, &sun_url(config, None)).await?;

    let sunrise = sun.results.sunrise.with_timezone(&Local);
    let sunset = sun.results.sunset.with_timezone(&Local);
    let is_daytime = sunrise <= now && now < sunset;

    // First period matching the current day/night phase; NWS alternates
    // day and night periods so the very first one may describe tonight.
    let current = forecast
        .properties
        .periods
        .iter()
        .find(|p| p.is_daytime == is_daytime)
        .or_else(|| forecast.properties.periods.first())
        .context("forecast returned no periods")?;

    let (sun_event_icon, sun_event_label) = if now < sunrise {
        ("sunrise", clock_label(sunrise))
    } else if now < sunset {
        ("sunset", clock_label(sunset))
    } else {
        // Past sunset: the next event is tomorrow's sunrise.
        let tomorrow = now.date_naive().succ_opt().context("date overflow")?;
        let sun: SunResponse = fetch_json(client, &sun_url(config, Some(tomorrow))).await?;
        ("sunrise", clock_label(sun.results.sunrise.with_timezone(&Local)))
    };

    let hourly = condense_hourly(&hourly.properties.periods, now, sunrise, sunset);
    debug!(periods = hourly.len(), "Hourly forecast condensed");

    Ok(WeatherSummary {
        temperature_text: format!(
            "{}°F {}",
            current.temperature,
            shorten_condition(&current.short_forecast)
        ),
        condition_icon: icon_for_condition(&current.short_forecast).to_string(),
        sun_event_icon: sun_event_icon.to_string(),
        sun_event_label,
        hourly,
        sunrise,
        sunset,
    })
}

/// Keeps periods from the current hour forward, capped at
/// [`HOURLY_PERIODS`], labeling the one covering `now` as `NOW` and
/// switching day icons to their night variants outside daylight.
fn condense_hourly(
    periods: &[ForecastPeriod],
    now: DateTime<Local>,
    sunrise: DateTime<Local>,
    sunset: DateTime<Local>,
) -> Vec<HourlyForecast> {
    let cutoff = now - Duration::minutes(CURRENT_HOUR_SLACK_MINUTES);

    periods
        .iter()
        .filter(|p| p.start_time.with_timezone(&Local) >= cutoff)
        .take(HOURLY_PERIODS)
        .enumerate()
        .map(|(idx, period)| {
            let starts_at = period.start_time.with_timezone(&Local);
            let label = if idx == 0 && starts_at.hour() == now.hour() {
                "NOW".to_string()
            } else {
                starts_at.format("%-I %p").to_string()
            };

            let is_night = starts_at < sunrise || starts_at >= sunset;
            let mut icon = icon_for_condition(&period.short_forecast);
            if is_night {
                icon = night_icon(icon);
            }

            HourlyForecast {
                label,
                temperature: period.temperature,
                icon: icon.to_string(),
                starts_at,
            }
        })
        .collect()
}

/// Maps a free-text condition to an icon key by substring matching.
pub fn icon_for_condition(condition: &str) -> &'static str {
    let c = condition.to_lowercase();

    if c.contains("thunder") || (c.contains("storm") && !c.contains("tropical")) {
        "thunderstorm"
    } else if c.contains("snow") || c.contains("flurr") || c.contains("blizzard") {
        "snow"
    } else if c.contains("rain") && c.contains("heavy") {
        "heavy-rain"
    } else if c.contains("rain") || c.contains("shower") {
        "rain"
    } else if c.contains("drizzle") {
        "drizzle"
    } else if c.contains("fog") || c.contains("mist") {
        "fog"
    } else if c.contains("clear") && c.contains("night") {
        "clear-night"
    } else if c.contains("partly") || c.contains("p.") {
        "partly-cloudy"
    } else if c.contains("mostly") || c.contains("m.") || c.contains("overcast") || c.contains("cloudy")
    {
        "cloudy"
    } else if c.contains("sunny") || c.contains("clear") {
        "sunny"
    } else {
        "partly-cloudy"
    }
}

fn night_icon(icon: &'static str) -> &'static str {
    match icon {
        "sunny" | "clear-night" => "clear-night",
        other => other,
    }
}

/// `Mostly Cloudy` → `M. Cloudy`, clamped to 15 chars so the footer text
/// never overruns its slot.
fn shorten_condition(condition: &str) -> String {
    let short = condition.replace("Mostly", "M.").replace("Partly", "P.");
    match short.char_indices().nth(15) {
        Some((idx, _)) => short[..idx].to_string(),
        None => short,
    }
}

fn clock_label(at: DateTime<Local>) -> String {
    at.format("%-I:%M %p").to_string()
}

fn points_url(config: &WeatherConfig) -> String {
    format!(
        "https://api.weather.gov/points/{:.4},{:.4}",
        config.latitude, config.longitude
    )
}

fn sun_url(config: &WeatherConfig, date: Option<NaiveDate>) -> String {
    let mut url = format!(
        "https://api.sunrise-sunset.org/json?lat={}&lng={}&formatted=0",
        config.latitude, config.longitude
    );
    if let Some(date) = date {
        url.push_str(&format!("&date={}", date.format("%Y-%m-%d")));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_mapping_common_conditions() {
        assert_eq!(icon_for_condition("Thunderstorms Likely"), "thunderstorm");
        assert_eq!(icon_for_condition("Light Snow"), "snow");
        assert_eq!(icon_for_condition("Heavy Rain"), "heavy-rain");
        assert_eq!(icon_for_condition("Rain Showers"), "rain");
        assert_eq!(icon_for_condition("Patchy Fog"), "fog");
        assert_eq!(icon_for_condition("Partly Cloudy"), "partly-cloudy");
        assert_eq!(icon_for_condition("Mostly Cloudy"), "cloudy");
        assert_eq!(icon_for_condition("Sunny"), "sunny");
        assert_eq!(icon_for_condition("Clear"), "sunny");
    }

    #[test]
    fn test_icon_mapping_defaults_to_partly_cloudy() {
        assert_eq!(icon_for_condition("Haboob"), "partly-cloudy");
    }

    #[test]
    fn test_night_icon_swaps_clear_skies() {
        assert_eq!(night_icon("sunny"), "clear-night");
        assert_eq!(night_icon("cloudy"), "cloudy");
        assert_eq!(night_icon("rain"), "rain");
    }

    #[test]
    fn test_shorten_condition_abbreviates_and_clamps() {
        assert_eq!(shorten_condition("Mostly Cloudy"), "M. Cloudy");
        assert_eq!(shorten_condition("Partly Sunny"), "P. Sunny");
        assert_eq!(
            shorten_condition("Chance Showers And Thunderstorms"),
            "Chance Showers "
        );
    }

    #[test]
    fn test_points_response_parses() {
        let json = r#"{
            "properties": {
                "forecast": "https://api.weather.gov/gridpoints/OKX/33,35/forecast",
                "forecastHourly": "https://api.weather.gov/gridpoints/OKX/33,35/forecast/hourly"
            }
        }"#;
        let points: PointsResponse = serde_json::from_str(json).unwrap();
        assert!(points.properties.forecast_hourly.ends_with("/hourly"));
    }

    #[test]
    fn test_forecast_response_parses() {
        let json = r#"{
            "properties": {
                "periods": [
                    {
                        "startTime": "2024-06-01T18:00:00-04:00",
                        "temperature": 74,
                        "shortForecast": "Mostly Clear",
                        "isDaytime": false
                    }
                ]
            }
        }"#;
        let forecast: ForecastResponse = serde_json::from_str(json).unwrap();
        assert_eq!(forecast.properties.periods.len(), 1);
        assert_eq!(forecast.properties.periods[0].temperature, 74);
        assert!(!forecast.properties.periods[0].is_daytime);
    }

    #[test]
    fn test_sun_response_parses() {
        let json = r#"{
            "results": {
                "sunrise": "2024-06-01T09:26:39+00:00",
                "sunset": "2024-06-02T00:20:41+00:00"
            }
        }"#;
        let sun: SunResponse = serde_json::from_str(json).unwrap();
        assert!(sun.results.sunrise < sun.results.sunset);
    }

    #[test]
    fn test_sun_url_with_date() {
        let config = WeatherConfig {
            latitude: 40.7313,
            longitude: -73.9542,
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(sun_url(&config, Some(date)).ends_with("&date=2024-06-02"));
        assert!(!sun_url(&config, None).contains("date="));
    }
}
