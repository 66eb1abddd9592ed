use thiserror::Error;

/// Errors raised while loading a `.ts` catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The document is not well-formed XML
    #[error("Malformed XML at line {line}, column {column}: {message}")]
    Xml { line: u32, column: u32, message: String },
    /// The document has no `<TS>` root element
    #[error("Missing <TS> root element")]
    MissingRoot,
    /// An element that the `.ts` schema does not allow at this point
    #[error("Unexpected element <{element}> inside <{parent}> at line {line}")]
    UnexpectedElement { element: String, parent: String, line: u32 },
    /// A `<message>` without `<source>`
    #[error("<message> without <source> in context '{context}' at line {line}")]
    MissingSource { context: String, line: u32 },
    /// An attribute value outside its allowed set
    #[error("Invalid value '{value}' for attribute '{attribute}' at line {line}")]
    InvalidAttribute { attribute: String, value: String, line: u32 },
    /// The document ends inside an open element
    #[error("Unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },
    /// Failure reading the catalog from disk
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}
