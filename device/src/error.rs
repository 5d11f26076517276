use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Hardware limits were requested with no compilation target in scope.
    #[snafu(display("no compilation target is bound"))]
    NoTargetBound,

    /// Thread limit must be a positive count.
    #[snafu(display("invalid max thread count {value} for target {target}"))]
    InvalidThreadLimit { target: String, value: usize },

    /// Invalid target specification.
    #[snafu(display("invalid target: {target}"))]
    InvalidTarget { target: String },
}
