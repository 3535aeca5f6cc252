//! Pin-to-recipe import: JSON-LD first, then AI extraction from page text,
//! then AI generation from the pin's own title and description.

pub mod html;
pub mod jsonld;
pub mod pipeline;

pub use pipeline::{
    DuplicatePin, ExtractedRecipe, ExtractionMethod, FailedPin, ImportReport, ImportedPin,
    Importer,
};
