use log::{debug, warn};
use thiserror::Error;

use crate::{
    board::{
        mesadata::{AccessMesadata, Mesadata},
        Board,
    },
    math::Point,
    node::{
        item::{GetMaybeNet, Item, ItemId},
        obstacle::Obstacle,
        rules::{AccessRules, RuleCache},
        NodeArena, NodeError, NodeHandle,
    },
    router::{
        dragger::Dragger,
        line::Line,
        placer::{LinePlacer, Placement, PlacementObserver, PlacerState},
        settings::RouterSettings,
    },
    session::{
        history::{History, HistoryError, Transaction},
        observer::{BoardObserver, CommitSummary, EmptyObserver},
    },
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("a gesture is already in progress")]
    GestureActive,
    #[error("no gesture in progress")]
    NoGesture,
    #[error("the gesture in progress does not support this")]
    WrongGesture,
    #[error("net {0} is not on the board")]
    UnknownNet(usize),
    #[error("no layer named {0:?}")]
    NoSuchLayerName(String),
    #[error("no net named {0:?}")]
    NoSuchNetName(String),
    #[error("item {0:?} cannot be dragged")]
    NotDraggable(ItemId),
}

#[derive(Debug, Clone)]
pub enum Gesture {
    Route(LinePlacer),
    Drag(Dragger),
}

impl Gesture {
    pub fn state(&self) -> PlacerState {
        match self {
            Gesture::Route(placer) => placer.state(),
            Gesture::Drag(dragger) => dragger.state(),
        }
    }

    pub fn current_node(&self) -> NodeHandle {
        match self {
            Gesture::Route(placer) => placer.current_node(),
            Gesture::Drag(dragger) => dragger.current_node(),
        }
    }
}

/// Router session. Gestures run on a branch of the committed board and only reach it through
/// `finish`; nothing a gesture does before that is visible in the root node.
pub struct Session<R: AccessRules, O: BoardObserver + PlacementObserver = EmptyObserver> {
    arena: NodeArena,
    mesadata: Mesadata,
    rules: RuleCache<R>,
    settings: RouterSettings,
    history: History,
    gesture: Option<Gesture>,
    last_placement: Option<Placement>,
    observer: O,
}

impl<R: AccessRules> Session<R, EmptyObserver> {
    pub fn new(board: Board, rules: R, settings: RouterSettings) -> Self {
        Self::with_observer(board, rules, settings, EmptyObserver)
    }
}

impl<R: AccessRules, O: BoardObserver + PlacementObserver> Session<R, O> {
    pub fn with_observer(board: Board, rules: R, settings: RouterSettings, observer: O) -> Self {
        let (arena, mesadata) = board.dissolve();

        Self {
            arena,
            mesadata,
            rules: RuleCache::new(rules),
            settings,
            history: History::new(),
            gesture: None,
            last_placement: None,
            observer,
        }
    }

    /// Starts a new trace at `from` on `layer`.
    pub fn start_route(
        &mut self,
        from: Point,
        layer: usize,
        net: usize,
        width: i64,
    ) -> Result<(), SessionError> {
        if self.gesture.is_some() {
            return Err(SessionError::GestureActive);
        }

        if self.mesadata.net_netname(net).is_none() {
            return Err(SessionError::UnknownNet(net));
        }

        self.prefetch_rules();

        let root = self.arena.root();
        let placer = LinePlacer::new(&mut self.arena, root, from, layer, width, net)?;
        debug!("route started at {:?} on layer {}, net {}", from, layer, net);

        self.gesture = Some(Gesture::Route(placer));
        self.last_placement = None;
        Ok(())
    }

    /// Starts dragging the track segment `item`, grabbed at `grab`.
    pub fn start_drag(&mut self, item: ItemId, grab: Point) -> Result<(), SessionError> {
        if self.gesture.is_some() {
            return Err(SessionError::GestureActive);
        }

        let root = self.arena.root();
        let dragged = self
            .arena
            .item(root, item)?
            .ok_or(NodeError::NoSuchItem(item))?;

        if !Dragger::is_draggable(dragged) {
            return Err(SessionError::NotDraggable(item));
        }

        self.prefetch_rules();

        let dragger = Dragger::new(&mut self.arena, root, item, grab)?;
        debug!("drag of {:?} started at {:?}", item, grab);

        self.gesture = Some(Gesture::Drag(dragger));
        self.last_placement = None;
        Ok(())
    }

    /// Moves the cursor of whatever gesture is in progress.
    pub fn move_to(&mut self, cursor: Point) -> Result<Placement, SessionError> {
        let gesture = self.gesture.as_mut().ok_or(SessionError::NoGesture)?;

        let result = match gesture {
            Gesture::Route(placer) => placer.move_to(
                &mut self.arena,
                cursor,
                &self.rules,
                &self.settings,
                &mut self.observer,
            ),
            Gesture::Drag(dragger) => dragger.drag_to(
                &mut self.arena,
                cursor,
                &self.rules,
                &self.settings,
                &mut self.observer,
            ),
        };

        self.record(result)
    }

    pub fn drag_to(&mut self, cursor: Point) -> Result<Placement, SessionError> {
        match self.gesture {
            Some(Gesture::Drag(_)) => self.move_to(cursor),
            Some(Gesture::Route(_)) => Err(SessionError::WrongGesture),
            None => Err(SessionError::NoGesture),
        }
    }

    /// Ends the current head with a via and continues routing on `layer`.
    pub fn switch_layer(&mut self, layer: usize) -> Result<Placement, SessionError> {
        let placer = match self.gesture.as_mut() {
            Some(Gesture::Route(placer)) => placer,
            Some(Gesture::Drag(_)) => return Err(SessionError::WrongGesture),
            None => return Err(SessionError::NoGesture),
        };

        let result = placer.switch_layer(
            &mut self.arena,
            layer,
            &self.rules,
            &self.settings,
            &mut self.observer,
        );

        self.record(result)
    }

    /// Ends the current head with a via to the opposite outer layer.
    pub fn place_via(&mut self) -> Result<Placement, SessionError> {
        let placer = match self.gesture.as_mut() {
            Some(Gesture::Route(placer)) => placer,
            Some(Gesture::Drag(_)) => return Err(SessionError::WrongGesture),
            None => return Err(SessionError::NoGesture),
        };

        let result = placer.place_via(
            &mut self.arena,
            &self.rules,
            &self.settings,
            &mut self.observer,
        );

        self.record(result)
    }

    /// Commits the gesture into the board and records it in the history.
    pub fn finish(&mut self) -> Result<CommitSummary, SessionError> {
        let gesture = self.gesture.take().ok_or(SessionError::NoGesture)?;
        self.last_placement = None;

        let base = match gesture {
            Gesture::Route(placer) => placer.finish(&mut self.arena),
            Gesture::Drag(dragger) => dragger.finish(&mut self.arena),
        };

        let transaction = match base.and_then(|base| self.commit(base)) {
            Ok(transaction) => transaction,
            Err(err) => return Err(self.abort(err)),
        };

        let summary = CommitSummary::from(&transaction);

        if !transaction.is_empty() {
            self.history.do_(transaction);
        }

        debug!(
            "committed {} added and {} removed items",
            summary.added.len(),
            summary.removed.len()
        );
        self.observer.on_commit(&summary);
        Ok(summary)
    }

    fn commit(&mut self, base: NodeHandle) -> Result<Transaction, NodeError> {
        let transaction = Transaction::from(self.arena.delta(base)?);
        self.arena.commit(base)?;
        Ok(transaction)
    }

    /// Drops the gesture. The board stays exactly as it was before the gesture started.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        let gesture = self.gesture.take().ok_or(SessionError::NoGesture)?;
        self.last_placement = None;

        let result = match gesture {
            Gesture::Route(placer) => placer.cancel(&mut self.arena),
            Gesture::Drag(dragger) => dragger.cancel(&mut self.arena),
        };

        if let Err(err) = result {
            return Err(self.abort(err));
        }

        debug!("gesture cancelled");
        Ok(())
    }

    pub fn undo(&mut self) -> Result<CommitSummary, SessionError> {
        if self.gesture.is_some() {
            return Err(SessionError::GestureActive);
        }

        let transaction = self.history.last_done()?.inverse();
        let summary = self.apply(&transaction)?;
        self.history.undo()?;

        debug!("undid transaction of {} items", summary.added.len() + summary.removed.len());
        Ok(summary)
    }

    pub fn redo(&mut self) -> Result<CommitSummary, SessionError> {
        if self.gesture.is_some() {
            return Err(SessionError::GestureActive);
        }

        let transaction = self.history.last_undone()?.clone();
        let summary = self.apply(&transaction)?;
        self.history.redo()?;

        debug!("redid transaction of {} items", summary.added.len() + summary.removed.len());
        Ok(summary)
    }

    /// Applies a transaction to the board through a branch, so that a transaction which does
    /// not fit the board leaves it untouched.
    fn apply(&mut self, transaction: &Transaction) -> Result<CommitSummary, SessionError> {
        let root = self.arena.root();
        let branch = self.arena.branch(root)?;

        let result = (|| -> Result<NodeHandle, NodeError> {
            for (id, _) in &transaction.removed {
                self.arena.remove(branch, *id)?;
            }

            for (id, item) in &transaction.added {
                self.arena.add_with_id(branch, *id, item.clone())?;
            }

            self.arena.commit(branch)
        })();

        if let Err(err) = result {
            self.arena.discard_branches(root)?;
            return Err(err.into());
        }

        let summary = CommitSummary::from(transaction);
        self.observer.on_commit(&summary);
        Ok(summary)
    }

    fn record(
        &mut self,
        result: Result<Placement, NodeError>,
    ) -> Result<Placement, SessionError> {
        match result {
            Ok(placement) => {
                self.last_placement = Some(placement.clone());
                Ok(placement)
            }
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Structural errors end the gesture: everything branched from the board is dropped.
    fn abort(&mut self, err: NodeError) -> SessionError {
        warn!("gesture aborted: {}", err);

        self.gesture = None;
        self.last_placement = None;

        let root = self.arena.root();

        if let Err(discard_err) = self.arena.discard_branches(root) {
            warn!("could not drop trial branches: {}", discard_err);
        }

        SessionError::Node(err)
    }

    fn prefetch_rules(&self) {
        let mut nets: Vec<Option<usize>> = (0..self.mesadata.net_count()).map(Some).collect();
        nets.push(None);
        self.rules.prefetch(&nets, self.arena.layer_count());
    }

    pub fn state(&self) -> PlacerState {
        self.gesture
            .as_ref()
            .map_or(PlacerState::Idle, |gesture| gesture.state())
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Whether a gesture is in progress and its last placement keeps every clearance.
    pub fn is_committable(&self) -> bool {
        self.gesture.is_some()
            && self
                .last_placement
                .as_ref()
                .is_some_and(|placement| placement.is_valid())
    }

    pub fn current_line(&self) -> Option<&Line> {
        self.last_placement.as_ref().map(|placement| &placement.line)
    }

    pub fn violations(&self) -> &[Obstacle] {
        self.last_placement
            .as_ref()
            .map_or(&[], |placement| placement.violations.as_slice())
    }

    /// Node showing the board as the gesture in progress would leave it.
    pub fn preview_node(&self) -> NodeHandle {
        self.gesture
            .as_ref()
            .map_or(self.arena.root(), |gesture| gesture.current_node())
    }

    pub fn preview_items(&self) -> Result<Vec<(ItemId, Item)>, SessionError> {
        Ok(self
            .arena
            .items(self.preview_node())?
            .into_iter()
            .map(|(id, item)| (id, item.clone()))
            .collect())
    }

    pub fn layer_by_name(&self, layername: &str) -> Result<usize, SessionError> {
        self.mesadata
            .layername_layer(layername)
            .ok_or_else(|| SessionError::NoSuchLayerName(layername.to_string()))
    }

    pub fn net_by_name(&self, netname: &str) -> Result<usize, SessionError> {
        self.mesadata
            .netname_net(netname)
            .ok_or_else(|| SessionError::NoSuchNetName(netname.to_string()))
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn mesadata(&self) -> &Mesadata {
        &self.mesadata
    }

    pub fn rules(&self) -> &RuleCache<R> {
        &self.rules
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Takes effect from the next cursor move on.
    pub fn set_settings(&mut self, settings: RouterSettings) {
        self.settings = settings;
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The committed board. A gesture still in progress is dropped.
    pub fn into_board(mut self) -> Board {
        if self.gesture.take().is_some() {
            let root = self.arena.root();

            if let Err(err) = self.arena.discard_branches(root) {
                warn!("could not drop trial branches: {}", err);
            }
        }

        Board::from_parts(self.arena, self.mesadata)
    }
}
