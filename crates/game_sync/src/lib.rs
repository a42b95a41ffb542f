/// Pickem — Game Sync
///
/// Results list drží jeden řádek na zápas (date | home | away | skóre | status).
///   1. Insert fáze (ráno): chybějící dnešní zápasy → nové `Scheduled` řádky
///   2. Update fáze (večer): dohrané zápasy → skóre + `Final` / `OT` / `SO`
///   3. `SyncScheduler` spouští každou fázi max. jednou za den v jejím okně
///
/// Obě fáze jsou idempotentní, takže opakované spuštění nahrazuje retry.

mod engine;
mod record;
mod scheduler;

pub use engine::{GameSyncEngine, Phase, PhaseReport, SyncError, RESULTS_APPEND_RANGE, RESULTS_READ_RANGE};
pub use record::{GameRecord, GameStatus, TerminalPolicy};
pub use scheduler::{local_today, GateState, HourWindow, SyncScheduler, WindowError};
