//! Direct Google Calendar API push (feature `gcal`).
//!
//! `studyblock calendar connect --credentials client_secret.json` imports the
//! Desktop-app OAuth client downloaded from the Cloud Console and runs the
//! installed-app flow once. `push_events` then inserts study blocks and
//! breaks with their color and reminder overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use google_calendar3::CalendarHub;
use google_calendar3::api::{Event, EventDateTime, EventReminder, EventReminders};
use google_calendar3::oauth2::{self, ApplicationSecret};
use hyper::client::HttpConnector;
use hyper_rustls::HttpsConnector;
use tracing::{debug, info};

use crate::calendar::CalendarEvent;
use crate::state::ensure_studyblock_home;

type Hub = CalendarHub<HttpsConnector<HttpConnector>>;

fn secret_path() -> Result<PathBuf> {
    Ok(ensure_studyblock_home()?.join("google_client_secret.json"))
}

fn token_cache_path() -> Result<PathBuf> {
    Ok(ensure_studyblock_home()?.join("google_token_cache.json"))
}

/// Parse a client secret in Google's download format (`{"installed": {...}}`).
pub fn parse_client_secret(raw: &str) -> Result<ApplicationSecret> {
    let secret = oauth2::parse_application_secret(raw)
        .context("not a Google OAuth client secret (expected the Desktop app JSON download)")?;
    anyhow::ensure!(
        !secret.client_id.is_empty() && !secret.client_secret.is_empty(),
        "client secret is missing client_id or client_secret"
    );
    Ok(secret)
}

/// The imported client secret, if `calendar connect` has been run.
pub fn stored_client_secret() -> Result<ApplicationSecret> {
    let p = secret_path()?;
    let raw = fs::read_to_string(&p).with_context(|| {
        format!(
            "no Google client secret at {}; run: studyblock calendar connect --credentials <file>",
            p.display()
        )
    })?;
    parse_client_secret(&raw)
}

/// Import `credentials` (when given) and authorize. Tokens are cached so
/// later pushes run without a browser.
pub async fn connect(credentials: Option<&Path>) -> Result<()> {
    let secret = match credentials {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            let secret = parse_client_secret(&raw)?;
            let dest = secret_path()?;
            fs::write(&dest, raw).with_context(|| format!("write {}", dest.display()))?;
            info!(path = %dest.display(), "imported google client secret");
            secret
        }
        None => stored_client_secret()?,
    };

    hub(secret).await?;
    println!("Connected. Tokens cached at {}", token_cache_path()?.display());
    Ok(())
}

async fn hub(secret: ApplicationSecret) -> Result<Hub> {
    let auth = oauth2::InstalledFlowAuthenticator::builder(
        secret,
        oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path()?)
    .build()
    .await
    .context("building oauth authenticator")?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Ok(CalendarHub::new(hyper::Client::builder().build(connector), auth))
}

fn utc_time(at: chrono::DateTime<chrono::Utc>) -> EventDateTime {
    EventDateTime {
        date_time: Some(at),
        time_zone: Some("UTC".to_string()),
        ..Default::default()
    }
}

/// API representation of one study block or break.
pub fn to_api_event(e: &CalendarEvent) -> Event {
    let reminders = EventReminders {
        use_default: Some(false),
        overrides: Some(
            e.reminders
                .iter()
                .map(|r| EventReminder {
                    method: Some(r.method.as_str().to_string()),
                    minutes: Some(i32::try_from(r.minutes).unwrap_or(i32::MAX)),
                })
                .collect(),
        ),
    };

    Event {
        summary: Some(e.summary.clone()),
        description: Some(e.description.clone()),
        color_id: Some(e.color_id.to_string()),
        start: Some(utc_time(e.start_utc)),
        end: Some(utc_time(e.end_utc)),
        reminders: Some(reminders),
        ..Default::default()
    }
}

/// Insert `events` into `calendar_id`; returns the ids Google assigned.
pub async fn push_events(calendar_id: &str, events: &[CalendarEvent]) -> Result<Vec<String>> {
    let hub = hub(stored_client_secret()?).await?;

    let mut ids = Vec::with_capacity(events.len());
    for e in events {
        let (_, inserted) = hub
            .events()
            .insert(to_api_event(e), calendar_id)
            .doit()
            .await
            .with_context(|| format!("inserting event '{}'", e.summary))?;
        debug!(summary = %e.summary, id = ?inserted.id, "event inserted");
        ids.extend(inserted.id);
    }

    info!(count = ids.len(), calendar = calendar_id, "pushed study blocks");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{BREAK_COLOR, Reminder, ReminderMethod, STUDY_COLOR};
    use chrono::{TimeZone, Utc};

    fn block(color: &'static str, reminders: Vec<Reminder>) -> CalendarEvent {
        CalendarEvent {
            start_utc: Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap(),
            end_utc: Utc.with_ymd_and_hms(2026, 3, 2, 15, 30, 0).unwrap(),
            summary: "Study: Lab report".to_string(),
            description: "Course: CHEM 121\n".to_string(),
            color_id: color,
            reminders,
        }
    }

    #[test]
    fn study_block_keeps_color_and_reminders() {
        let ev = to_api_event(&block(
            STUDY_COLOR,
            vec![
                Reminder {
                    method: ReminderMethod::Popup,
                    minutes: 15,
                },
                Reminder {
                    method: ReminderMethod::Email,
                    minutes: 60,
                },
            ],
        ));
        assert_eq!(ev.color_id.as_deref(), Some("9"));
        assert_eq!(
            ev.start.and_then(|s| s.date_time),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap())
        );
        let reminders = ev.reminders.unwrap();
        assert_eq!(reminders.use_default, Some(false));
        let overrides = reminders.overrides.unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[1].method.as_deref(), Some("email"));
        assert_eq!(overrides[1].minutes, Some(60));
    }

    #[test]
    fn breaks_silence_default_reminders() {
        let ev = to_api_event(&block(BREAK_COLOR, Vec::new()));
        let reminders = ev.reminders.unwrap();
        assert_eq!(reminders.use_default, Some(false));
        assert_eq!(reminders.overrides.map(|o| o.len()), Some(0));
    }

    #[test]
    fn client_secret_download_is_accepted() {
        let raw = r#"{"installed": {
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "s3cr3t-value",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }}"#;
        let secret = parse_client_secret(raw).unwrap();
        assert_eq!(secret.client_id, "123.apps.googleusercontent.com");
    }

    #[test]
    fn random_json_is_not_a_client_secret() {
        assert!(parse_client_secret(r#"{"client_id": "x"}"#).is_err());
    }
}
