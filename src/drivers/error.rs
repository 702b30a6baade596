use thiserror::Error;
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("channel key `{0}` is configured more than once")]
    DuplicateChannel(String),
    #[error("record source failed: {0}")]
    Source(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DashboardError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for DashboardError {
    fn from(value: image::ImageError) -> Self {
        DashboardError::Plot(value.to_string())
    }
}
