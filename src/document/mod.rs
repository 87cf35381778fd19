/*!
 * Document assembly and output.
 *
 * - `layout`: validated presentation settings
 * - `model`: the format-agnostic `Document`
 * - `assembler`: renders parsed units into a `Document`
 * - `docx`: writes a `Document` as a `.docx` package
 */

pub mod assembler;
pub mod docx;
pub mod layout;
pub mod model;

pub use assembler::{CharacterRecord, DocumentSpec, ImageIndex, Section, assemble, order_appendix};
pub use docx::{DocumentWriter, DocxWriter};
pub use layout::{LayoutConfig, LayoutSettings, MarginProfile, PageSize, StyleSheet, TextStyle};
pub use model::{Alignment, Block, Document, Inline, PageSetup, Paragraph, Role, RunStyle};
