/// Pickem — Pick Ledger
///
/// `/pick` tok: Meta + Users → validace → zápis do sloupce hráče.
///
/// Adresace řádků: pevný `start_row` z Meta listu (kolo = blok řádků od
/// `start_row`, `games_today` řádků). Opakované odeslání přepíše stejné buňky.
/// Append-to-first-empty-row varianta se nepoužívá.

mod directory;
mod locks;
mod meta;
mod service;
mod validator;
mod writer;

pub use directory::UserDirectory;
pub use locks::ColumnLocks;
pub use meta::MetaConfig;
pub use service::{reply_for, PickService, SheetNames, SubmitError};
pub use validator::{parse_picks, validate, RejectionReason, ValidatedPicks};
pub use writer::{PickLedgerWriter, WriteError};
