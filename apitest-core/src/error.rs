pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Occurs when the configuration file fails to load or parse.
    #[error("failed to load configuration: {0}")]
    LoadError(String),
    /// Occurs when the specified key is not found in the configuration.
    #[error("the specified key \"{0}\" not found in the configuration")]
    ValueNotFound(String),
    /// Occurs when `config::current` is called before `config::load`.
    #[error("configuration requested before it was loaded")]
    NotLoaded,
    /// Occurs when a report operation runs outside a report scope.
    #[error("report context accessed outside of a test scope")]
    NoScope,
    /// Occurs when `report::open_child` is called before `report::open_parent`.
    #[error("no parent node bound; open_parent must be called before open_child")]
    NoParentBound,
    /// Occurs when `report::current` is called before `report::open_child`.
    #[error("no child node bound; open_child must be called before current")]
    NoChildBound,
    /// Occurs when the report artifact cannot be written.
    #[error("failed to write report artifact: {0}")]
    ReportWrite(String),
}
