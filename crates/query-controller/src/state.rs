use prediction_core::Analysis;

/// What the renderer shows for the current query.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(Analysis),
    Failure(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            RequestState::Success(analysis) => Some(analysis),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            RequestState::Failure(message) => Some(message),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Loading => "loading",
            RequestState::Success(_) => "success",
            RequestState::Failure(_) => "failure",
        }
    }
}
