use ratatui::{prelude::*, widgets::Cell};

use crate::colors::{BODY_COLOR, PINK_COLOR};

/// Header cells with the active sort column highlighted.
pub fn sortable_header(columns: Vec<&'_ str>, selected_column: usize) -> Vec<Cell<'_>> {
    columns
        .into_iter()
        .enumerate()
        .map(|(i, column)| {
            if i == selected_column {
                Cell::from(column).style(Style::new().fg(PINK_COLOR).add_modifier(Modifier::BOLD))
            } else {
                Cell::from(column).style(Style::new().fg(BODY_COLOR))
            }
        })
        .collect()
}

/// A rect of the given percentage size, centered within `r`.
pub fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_centered_rect_is_centered() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(area, 50, 50);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 25);
        assert_eq!(rect.y, 10);
    }
}
