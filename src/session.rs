//! Game session: score, best score, lifecycle and input routing.

use crate::board::{Board, BoardEvent};
use crate::command::{Command, CommandHistory};
use crate::config::GameConfig;
use crate::error::Result;
use crate::grid::Direction;
use crate::store::{ScoreStore, BEST_SCORE_KEY};
use ndarray::Array2;
use std::time::Duration;

/// Everything a player can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    Move(Direction),
    Undo,
    Redo,
}

/// Notification sink for presentation code. Every hook defaults to doing
/// nothing.
pub trait Presenter {
    fn new_game(&mut self) {}

    fn game_over(&mut self) {}

    fn score_changed(&mut self, _score: u32, _best: u32) {}

    fn board_event(&mut self, _event: &BoardEvent) {}
}

/// Presenter that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// One player's game: the board, its history and the score.
///
/// # Examples
/// ```
/// use merge_puzzle::config::GameConfig;
/// use merge_puzzle::grid::Direction;
/// use merge_puzzle::session::{GameSession, Input, NullPresenter};
/// use merge_puzzle::store::MemoryScoreStore;
///
/// let mut session =
///     GameSession::new(GameConfig::default(), 42, MemoryScoreStore::new(), NullPresenter).unwrap();
/// assert_eq!(session.board().tile_count(), 2);
///
/// for direction in Direction::ALL {
///     session.handle(Input::Move(direction)).unwrap();
///     session.settle();
/// }
/// assert!(session.history().undo_len() <= 3);
/// assert!(session.best_score() >= session.score());
/// ```
#[derive(Debug)]
pub struct GameSession<S, P> {
    config: GameConfig,
    board: Board,
    history: CommandHistory,
    score: u32,
    best_score: u32,
    over: bool,
    store: S,
    presenter: P,
}

impl<S: ScoreStore, P: Presenter> GameSession<S, P> {
    /// Validates `config`, builds the grid and starts the first game.
    pub fn new(config: GameConfig, seed: u64, store: S, presenter: P) -> Result<Self> {
        let config = config.validate()?;
        let board = Board::new(&config, seed);
        let history = CommandHistory::new(config.undo_capacity);
        let best_score = store.best_score(BEST_SCORE_KEY);
        let mut session = GameSession {
            config,
            board,
            history,
            score: 0,
            best_score,
            over: false,
            store,
            presenter,
        };
        session.new_game()?;
        Ok(session)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    /// Whether the game ended; input is ignored until the next new game.
    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Resets the score and history and deals a fresh board with one `2` and
    /// the obstacle.
    pub fn new_game(&mut self) -> Result<()> {
        self.reset();
        self.board.spawn_random_tile()?;
        log::info!("New game on a {}x{} board", self.board.width(), self.board.height());
        self.pump();
        Ok(())
    }

    /// Starts a new game from a given position instead of a random one.
    pub fn new_game_from(&mut self, values: &Array2<u32>) -> Result<()> {
        self.reset();
        self.board.load_values(values)?;
        log::info!("New game from a preset position");
        self.pump();
        Ok(())
    }

    fn reset(&mut self) {
        self.best_score = self.store.best_score(BEST_SCORE_KEY);
        self.set_score(0);
        self.over = false;
        self.history.clear();
        self.board.clear();
        self.presenter.new_game();
    }

    /// Routes one player input to the board or the history.
    ///
    /// Moves go through the history so they can be undone. Undo restores the
    /// score saved with the snapshot and reports it to the presenter. Every
    /// event the board produced is forwarded before returning.
    ///
    /// # Arguments
    /// * `input`: What the player asked for.
    ///
    /// # Returns
    /// * `Ok(true)` if the board changed.
    /// * `Ok(false)` if the input was ignored: the game is over, a move is
    ///   still settling, nothing could move, or there was nothing to undo/redo.
    /// * `Err(_)` if a snapshot could not be restored.
    pub fn handle(&mut self, input: Input) -> Result<bool> {
        if self.over {
            log::debug!("Ignoring {:?} after game over", input);
            return Ok(false);
        }

        let changed = match input {
            Input::Move(direction) => self
                .history
                .add_command(Command::new_move(direction), &mut self.board, &mut self.score)
                .has_update(),
            Input::Undo => {
                let undone = self.history.undo(&mut self.board, &mut self.score)?;
                // The history already wrote the restored score; only notify.
                if undone {
                    self.set_score(self.score);
                }
                undone
            }
            Input::Redo => self.history.redo(&mut self.board, &mut self.score),
        };
        self.pump();
        Ok(changed)
    }

    /// Lets `elapsed` of animation time pass.
    pub fn advance(&mut self, elapsed: Duration) {
        self.board.advance(elapsed);
        self.pump();
    }

    /// Completes any settling move right away.
    pub fn settle(&mut self) {
        self.board.settle();
        self.pump();
    }

    pub fn increase_score(&mut self, amount: u32) {
        self.set_score(self.score.saturating_add(amount));
    }

    fn set_score(&mut self, score: u32) {
        self.score = score;
        if score > self.best_score {
            self.best_score = score;
            self.store.set_best_score(BEST_SCORE_KEY, score);
        }
        self.presenter.score_changed(self.score, self.best_score);
    }

    /// Ends the game and disables input.
    pub fn game_over(&mut self) {
        if self.over {
            return;
        }
        self.over = true;
        log::info!("Game over with {} points", self.score);
        self.presenter.game_over();
    }

    fn pump(&mut self) {
        for event in self.board.take_events() {
            self.presenter.board_event(&event);
            match event {
                // Score counts once the merge settles, not when it starts
                BoardEvent::Merged { value, .. } => self.increase_score(value),
                BoardEvent::GameOver => self.game_over(),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryScoreStore;
    use crate::tile::TileValue;
    use crate::utils::values_from_str_array;

    #[derive(Debug, Default)]
    struct Recorder {
        new_games: usize,
        game_overs: usize,
        scores: Vec<(u32, u32)>,
        events: Vec<BoardEvent>,
    }

    impl Presenter for Recorder {
        fn new_game(&mut self) {
            self.new_games += 1;
        }

        fn game_over(&mut self) {
            self.game_overs += 1;
        }

        fn score_changed(&mut self, score: u32, best: u32) {
            self.scores.push((score, best));
        }

        fn board_event(&mut self, event: &BoardEvent) {
            self.events.push(event.clone());
        }
    }

    fn session(
        width: usize,
        height: usize,
        store: MemoryScoreStore,
    ) -> GameSession<MemoryScoreStore, Recorder> {
        let config = GameConfig {
            width,
            height,
            obstacle_relocation_chance: 0.0,
            ..GameConfig::default()
        };
        GameSession::new(config, 17, store, Recorder::default()).unwrap()
    }

    fn position(rows: &[&str]) -> Array2<u32> {
        values_from_str_array(rows).unwrap()
    }

    #[test]
    fn test_new_game_deals_tile_and_obstacle() {
        let session = session(4, 4, MemoryScoreStore::new());
        let board = session.board();
        assert_eq!(board.tile_count(), 2);
        assert_eq!(board.tiles().filter(|t| t.is_obstacle()).count(), 1);
        assert_eq!(board.total_value(), 2);
        assert_eq!(session.score(), 0);
        assert_eq!(session.presenter().new_games, 1);
        assert!(!session.is_over());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GameConfig {
            width: 1,
            height: 1,
            ..GameConfig::default()
        };
        assert!(GameSession::new(config, 1, MemoryScoreStore::new(), NullPresenter).is_err());

        // A single row would let "2 # ." jam without ever ending the game.
        let config = GameConfig {
            width: 3,
            height: 1,
            ..GameConfig::default()
        };
        assert!(matches!(
            GameSession::new(config, 1, MemoryScoreStore::new(), NullPresenter),
            Err(crate::error::GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_merge_scores_after_settle() {
        let mut session = session(2, 2, MemoryScoreStore::new());
        session.new_game_from(&position(&["4 4", ". ."])).unwrap();

        assert!(session.handle(Input::Move(Direction::Left)).unwrap());
        assert_eq!(session.score(), 0);

        session.advance(Duration::from_millis(90));
        assert_eq!(session.score(), 8);
        assert_eq!(session.board().value_at((0, 0)), Some(TileValue::Number(8)));

        session.advance(Duration::from_millis(10));
        assert!(!session.board().is_moving());
        assert_eq!(session.presenter().scores.last(), Some(&(8, 8)));
    }

    #[test]
    fn test_undo_redo_restore_score_and_board() {
        let mut session = session(2, 2, MemoryScoreStore::new());
        session.new_game_from(&position(&["2 2", ". ."])).unwrap();

        session.handle(Input::Move(Direction::Left)).unwrap();
        session.settle();
        assert_eq!(session.score(), 4);
        let after = session.board().values();

        assert!(session.handle(Input::Undo).unwrap());
        assert_eq!(session.board().values(), position(&["2 2", ". ."]));
        assert_eq!(session.score(), 0);
        assert_eq!(session.best_score(), 4);

        assert!(session.handle(Input::Redo).unwrap());
        session.settle();
        assert_eq!(session.board().values(), after);
        assert_eq!(session.score(), 4);
    }

    #[test]
    fn test_best_score_persists_in_store() {
        let mut store = MemoryScoreStore::new();
        store.set_best_score(BEST_SCORE_KEY, 2);
        let mut session = session(2, 2, store);
        assert_eq!(session.best_score(), 2);

        session.new_game_from(&position(&["2 2", ". ."])).unwrap();
        session.handle(Input::Move(Direction::Left)).unwrap();
        session.settle();

        assert_eq!(session.best_score(), 4);
        assert_eq!(session.store().best_score(BEST_SCORE_KEY), 4);

        session.new_game().unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(session.best_score(), 4);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_game_over_disables_input() {
        let mut session = session(2, 2, MemoryScoreStore::new());
        session.new_game_from(&position(&["# 4", "8 ."])).unwrap();

        assert!(session.handle(Input::Move(Direction::Down)).unwrap());
        session.settle();

        assert!(session.is_over());
        assert_eq!(session.presenter().game_overs, 1);
        assert!(session
            .presenter()
            .events
            .contains(&BoardEvent::GameOver));

        let before = session.board().values();
        assert!(!session.handle(Input::Move(Direction::Up)).unwrap());
        assert!(!session.handle(Input::Undo).unwrap());
        assert_eq!(session.board().values(), before);

        session.new_game().unwrap();
        assert!(!session.is_over());
        assert_eq!(session.presenter().new_games, 3);
    }

    #[test]
    fn test_moves_ignored_while_settling() {
        let mut session = session(4, 2, MemoryScoreStore::new());
        session
            .new_game_from(&position(&["2 . . .", ". . . ."]))
            .unwrap();

        assert!(session.handle(Input::Move(Direction::Right)).unwrap());
        assert!(!session.handle(Input::Move(Direction::Left)).unwrap());
        assert!(!session.handle(Input::Undo).unwrap());
        assert_eq!(session.history().undo_len(), 1);
    }

    #[test]
    fn test_increase_score_is_reported() {
        let mut session = session(2, 2, MemoryScoreStore::new());
        session.increase_score(16);
        assert_eq!(session.score(), 16);
        assert_eq!(session.presenter().scores.last(), Some(&(16, 16)));
    }
}
