/// Component-to-app signals that are not user actions.
#[derive(Debug, Clone)]
pub enum AppEvent {
    CommandPaletteOpened,
    CommandPaletteClosed,
}
