use ratatui::style::Color;

// based on the catpuccin-mocha color theme
// https://github.com/catppuccin/catppuccin/blob/main/docs/style-guide.md
pub(crate) const BG_COLOR: Color = Color::from_u32(0x001e1e2e);
pub(crate) const BODY_COLOR: Color = Color::from_u32(0x00cdd6f4);
pub(crate) const ACTIVE_BORDER_COLOR: Color = Color::from_u32(0x00f5e0dc);
pub(crate) const INACTIVE_BORDER_COLOR: Color = Color::from_u32(0x006c7086);

pub(crate) const RED_COLOR: Color = Color::from_u32(0x00f38ba8);
pub(crate) const GREEN_COLOR: Color = Color::from_u32(0x00a6e3a1);
pub(crate) const YELLOW_COLOR: Color = Color::from_u32(0x00f9e2af);
pub(crate) const BLUE_COLOR: Color = Color::from_u32(0x0089b4fa);
pub(crate) const PINK_COLOR: Color = Color::from_u32(0x00f5c2e7);
