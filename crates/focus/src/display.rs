//! Display glue for the status surface and the blocked page

use chrono::{DateTime, FixedOffset, Utc};
use std::path::Path;

use crate::config::BlockerConfig;
use crate::coordinator::Status;

/// Badge text shown next to the blocker's icon
pub fn badge_text(status: &Status) -> &'static str {
    if status.should_block {
        "ON"
    } else {
        "OFF"
    }
}

/// "BLOCKING ACTIVE - 10:42:07" style status line
pub fn status_line(status: &Status, now: &DateTime<FixedOffset>) -> String {
    let state = if status.should_block {
        "BLOCKING ACTIVE"
    } else {
        "BLOCKING INACTIVE"
    };
    format!("{} - {}", state, now.format("%H:%M:%S"))
}

/// "until 11:00 (42 min left)" for a pending manual focus session, in the
/// timezone of `now`
pub fn focus_summary(status: &Status, now: &DateTime<FixedOffset>) -> Option<String> {
    let session = status.manual_focus_session()?;
    let end = session.end().with_timezone(&now.timezone());
    Some(format!(
        "until {} ({} min left)",
        end.format("%H:%M"),
        session.remaining_minutes_at(now.with_timezone(&Utc))
    ))
}

/// `file://` URL for a page on disk
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Redirect target for blocked navigations: the configured URL, or the
/// blocked page rendered at `default_page`
pub fn redirect_target(config: &BlockerConfig, default_page: &Path) -> String {
    config
        .blocked_page_url
        .clone()
        .unwrap_or_else(|| file_url(default_page))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Static page shown in place of a blocked site
pub fn blocked_page_html(config: &BlockerConfig) -> String {
    let days = escape_html(&config.schedule.days_label());
    let hours = escape_html(&config.schedule.hours_label());
    let sites: String = config
        .blocked_sites
        .iter()
        .map(|s| format!("      <li>{}</li>\n", escape_html(s)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Site blocked</title>
  <style>
    body {{ font-family: sans-serif; max-width: 36rem; margin: 4rem auto; color: #222; }}
    h1 {{ color: #c0392b; }}
  </style>
</head>
<body>
  <h1>This site is blocked</h1>
  <p>Blocking is active for the scheduled window or a manual focus session.</p>
  <div id="scheduleInfo">
    <p><strong>Days:</strong> {days}</p>
    <p><strong>Time:</strong> {hours}</p>
  </div>
  <h2>Blocked sites</h2>
  <ul id="blockedSitesList">
{sites}  </ul>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn status(should_block: bool) -> Status {
        Status {
            is_scheduled_blocking: should_block,
            is_manual_focus: false,
            manual_focus_end_time: None,
            should_block,
        }
    }

    #[test]
    fn test_badge_and_status_line() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 13, 10, 42, 7)
            .unwrap();
        assert_eq!(badge_text(&status(true)), "ON");
        assert_eq!(badge_text(&status(false)), "OFF");
        assert_eq!(status_line(&status(true), &now), "BLOCKING ACTIVE - 10:42:07");
        assert_eq!(status_line(&status(false), &now), "BLOCKING INACTIVE - 10:42:07");
    }

    #[test]
    fn test_focus_summary_uses_given_time() {
        let now = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 13, 10, 18, 0)
            .unwrap();
        let session = crate::session::ManualFocusSession::starting_at(
            (now - chrono::Duration::minutes(18)).with_timezone(&Utc),
        );
        let status = Status {
            is_scheduled_blocking: false,
            is_manual_focus: true,
            manual_focus_end_time: Some(session.end_time),
            should_block: true,
        };

        assert_eq!(
            focus_summary(&status, &now).as_deref(),
            Some("until 11:00 (42 min left)")
        );
        assert!(focus_summary(&self::status(false), &now).is_none());
    }

    #[test]
    fn test_redirect_target() {
        let page = PathBuf::from("/home/me/.local/share/focusguard/blocked.html");
        let mut config = BlockerConfig::default();
        assert_eq!(
            redirect_target(&config, &page),
            "file:///home/me/.local/share/focusguard/blocked.html"
        );

        config.blocked_page_url = Some("https://example.com/blocked".to_string());
        assert_eq!(redirect_target(&config, &page), "https://example.com/blocked");
    }

    #[test]
    fn test_blocked_page_lists_schedule_and_sites() {
        let html = blocked_page_html(&BlockerConfig::default());
        assert!(html.contains("<strong>Days:</strong> Monday, Tuesday, Wednesday, Thursday, Friday"));
        assert!(html.contains("<strong>Time:</strong> 1:00 AM - 3:00 PM"));
        assert!(html.contains("<li>reddit.com</li>"));
        assert!(html.contains("<li>instagram.com</li>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a&b>"), "&lt;a&amp;b&gt;");
    }
}
