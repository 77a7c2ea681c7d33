//! Read-only status page.
//!
//! One route, `GET /`, projecting the session state into HTML: connected,
//! pairing (QR image or code) or starting up.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use log::warn;
use qrcode::render::svg;
use qrcode::QrCode;
use taskbot_core::{PairingArtifact, SessionState};
use tokio::sync::watch;

const QR_SIZE_PX: u32 = 300;

const READY_HTML: &str = r#"
<div style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1>✅ Bot is Connected!</h1>
    <p>You can close this window. Your bot is listening for commands.</p>
</div>
"#;

const STARTING_HTML: &str = r#"
<div style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1>⏳ Starting up...</h1>
    <p>Please wait 10-20 seconds and refresh this page.</p>
</div>
"#;

/// Builds the router serving the status page.
pub fn router(state: watch::Receiver<SessionState>) -> Router {
    Router::new()
        .route("/", get(status_page))
        .with_state(state)
}

async fn status_page(State(state): State<watch::Receiver<SessionState>>) -> Html<String> {
    let snapshot = state.borrow().clone();
    Html(render_status_page(&snapshot))
}

/// Renders the page for one session state.
pub fn render_status_page(state: &SessionState) -> String {
    match state {
        SessionState::Ready => READY_HTML.to_string(),
        SessionState::Pairing(PairingArtifact::Qr(payload)) => match qr_svg(payload) {
            Ok(image) => qr_html(&image),
            Err(err) => {
                warn!("event=status_render module=status_page status=error error_code=qr_encode_failed error={err}");
                STARTING_HTML.to_string()
            }
        },
        SessionState::Pairing(PairingArtifact::Code(code)) => code_html(code),
        SessionState::Starting => STARTING_HTML.to_string(),
    }
}

fn qr_svg(payload: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_SIZE_PX, QR_SIZE_PX)
        .build();
    // Drop the XML prolog so the SVG can be inlined into HTML.
    Ok(match image.find("<svg") {
        Some(start) => image[start..].to_string(),
        None => image,
    })
}

fn qr_html(image: &str) -> String {
    format!(
        r#"
<div style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1>Scan this QR Code</h1>
    <p>Open WhatsApp &gt; Settings &gt; Linked Devices &gt; Link a Device</p>
    <div style="display: inline-block; border: 2px solid #333;">{image}</div>
    <p>Refresh this page if the code expires.</p>
</div>
"#
    )
}

fn code_html(code: &str) -> String {
    format!(
        r#"
<div style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1>Enter this pairing code</h1>
    <p>Open WhatsApp &gt; Settings &gt; Linked Devices &gt; Link a Device &gt; Link with phone number instead</p>
    <p style="font-size: 2.5em; letter-spacing: 0.2em; font-family: monospace;">{}</p>
    <p>Refresh this page if the code expires.</p>
</div>
"#,
        escape_html(code)
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
