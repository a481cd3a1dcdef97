//! Detail overlay for a single pull request: diff stats, description, and
//! the review conversation reconstructed into threads.

use std::any::Any;

use color_eyre::eyre::Result;
use ratatui::{prelude::*, widgets::*};

use super::Component;
use crate::{
    action::Action,
    colors::{ACTIVE_BORDER_COLOR, BG_COLOR, BLUE_COLOR, BODY_COLOR, GREEN_COLOR, RED_COLOR, YELLOW_COLOR},
    github::{
        models::{FullPullRequest, PullRequest, Review, ReviewState},
        reviews::{build_review_threads, flatten_threads, ReviewThread},
    },
    tui::Frame,
};

#[derive(Default)]
pub struct PullRequestInfoOverlay {
    pull_request: Option<PullRequest>,
    details: Option<FullPullRequest>,
    reviews: Vec<Review>,
    threads: Vec<ReviewThread>,
    scroll_offset: u16,
    loading: bool,
}

impl PullRequestInfoOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    fn review_color(state: ReviewState) -> Color {
        match state {
            ReviewState::Approved => GREEN_COLOR,
            ReviewState::ChangesRequested => RED_COLOR,
            ReviewState::Dismissed => YELLOW_COLOR,
            ReviewState::Commented | ReviewState::Pending => BLUE_COLOR,
        }
    }

    fn body_lines(&self) -> Vec<Line<'_>> {
        let mut lines: Vec<Line> = Vec::new();
        let body = self
            .pull_request
            .as_ref()
            .and_then(|pr| pr.issue.body.clone())
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| String::from("No description provided."));
        for line in body.lines() {
            lines.push(Line::from(line.to_string()));
        }

        if self.loading {
            lines.push(Line::default());
            lines.push(Line::styled("Loading reviews...", Style::default().fg(YELLOW_COLOR)));
            return lines;
        }

        for review in &self.reviews {
            lines.push(Line::default());
            lines.push(Line::styled(
                format!("Review: {} by {}", review.state, review.user.login),
                Style::default().fg(Self::review_color(review.state)).add_modifier(Modifier::BOLD),
            ));
            if !review.body.is_empty() {
                lines.push(Line::from(review.body.clone()));
            }
        }
        if !self.threads.is_empty() {
            lines.push(Line::default());
            lines.push(Line::styled("Conversation", Style::default().add_modifier(Modifier::BOLD)));
            for (depth, comment) in flatten_threads(&self.threads) {
                let indent = "  ".repeat(depth + 1);
                let author = comment.comment.user.as_ref().map(|u| u.login.as_str()).unwrap_or("unknown");
                lines.push(Line::styled(
                    format!("{indent}{author} on {}:", comment.path),
                    Style::default().fg(BLUE_COLOR),
                ));
                for body_line in comment.comment.body.lines() {
                    lines.push(Line::from(format!("{indent}  {body_line}")));
                }
            }
        }
        lines
    }
}

impl Component for PullRequestInfoOverlay {
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        match action {
            Action::ShownPullRequestChanged(pr) => {
                self.pull_request = Some(*pr);
                self.details = None;
                self.reviews.clear();
                self.threads.clear();
                self.scroll_offset = 0;
                self.loading = true;
            },
            Action::PullRequestDetailsLoaded(details, reviews) => {
                self.threads = build_review_threads(&reviews);
                self.reviews = reviews;
                self.details = Some(*details);
                self.loading = false;
            },
            Action::Error(_) => self.loading = false,
            Action::Up => self.scroll_offset = self.scroll_offset.saturating_sub(1),
            Action::Down => self.scroll_offset = self.scroll_offset.saturating_add(1),
            Action::PageUp => self.scroll_offset = self.scroll_offset.saturating_sub(10),
            Action::PageDn => self.scroll_offset = self.scroll_offset.saturating_add(10),
            Action::Open => {
                if let Some(pr) = &self.pull_request {
                    let _ = open::that(pr.issue.html_url.clone());
                }
            },
            _ => {},
        }
        Ok(None)
    }

    fn draw(&mut self, f: &mut Frame<'_>, area: Rect) -> Result<()> {
        let Some(pr) = &self.pull_request else { return Ok(()) };

        let block = Block::default()
            .title(format!(" Pull request #{} ", pr.issue.number))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(ACTIVE_BORDER_COLOR)
            .style(Style::default().bg(BG_COLOR).fg(BODY_COLOR));
        f.render_widget(Clear, area);
        f.render_widget(block, area);

        let layout = Layout::new(Direction::Vertical, [
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Percentage(100),
        ])
        .split(area.inner(&Margin { horizontal: 1, vertical: 1 }));

        let mut header_lines = vec![
            Line::styled(pr.issue.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Line::from(format!(
                "Opened by {} on {}",
                pr.issue.user.login,
                pr.issue.created_at.format("%Y-%m-%d")
            )),
        ];
        match &self.details {
            Some(details) => {
                header_lines.push(Line::from(format!(
                    "{} <- {}   +{} -{}   {} files, {} commits",
                    details.base.ref_name,
                    details.head.ref_name,
                    details.additions,
                    details.deletions,
                    details.changed_files,
                    details.commits,
                )));
            },
            None => header_lines.push(Line::from(if self.loading { "Loading details..." } else { "" })),
        }

        let separator = Paragraph::new("─".repeat(area.width as usize)).style(Style::default().fg(BODY_COLOR));
        let body = Paragraph::new(self.body_lines())
            .style(Style::default().fg(BODY_COLOR))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll_offset, 0));

        f.render_widget(Paragraph::new(header_lines), layout[0]);
        f.render_widget(separator, layout[1]);
        f.render_widget(body, layout[2]);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
