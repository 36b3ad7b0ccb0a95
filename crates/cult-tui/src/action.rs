//! Action enum — what a key press or click asks the App to do.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TogglePlayback,
    Quit,
}
