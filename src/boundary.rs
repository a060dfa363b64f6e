use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub type Fallback = Box<dyn Fn(&mut Frame, Rect, &str)>;

/// Catches panics raised while drawing a view and shows a fallback in its place
/// until [`ErrorBoundary::reset`] is called.
#[derive(Default)]
pub struct ErrorBoundary {
    fault: Option<String>,
    fallback: Option<Fallback>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: impl Fn(&mut Frame, Rect, &str) + 'static) -> Self {
        ErrorBoundary {
            fault: None,
            fallback: Some(Box::new(fallback)),
        }
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub fn reset(&mut self) {
        self.fault = None;
    }

    pub fn render<F>(&mut self, frame: &mut Frame, area: Rect, view: F)
    where
        F: FnOnce(&mut Frame),
    {
        if self.fault.is_none() {
            match panic::catch_unwind(AssertUnwindSafe(|| view(frame))) {
                Ok(()) => return,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Error caught by boundary: {message}");
                    self.fault = Some(message);
                }
            }
        }

        let message = self.fault.as_deref().unwrap_or_default();
        frame.render_widget(Clear, area);
        match &self.fallback {
            Some(fallback) => fallback(frame, area, message),
            None => default_fallback(frame, area, message),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}

fn default_fallback(frame: &mut Frame, area: Rect, message: &str) {
    let text = vec![
        Line::from(Span::styled(
            "Oops! Something went wrong.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("Press R to reload the application, q to quit."),
    ];
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Error"))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}
