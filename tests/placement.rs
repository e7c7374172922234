use geo::point;
use pnsroute::{
    geometry::shape::MeasureLength,
    node::{
        item::{GetAnchors, GetMaybeNet},
        rules::ClearanceRules,
        NodeArena, NodeHandle,
    },
    router::{
        placer::PlacerState,
        settings::{RouterMode, RouterSettings},
    },
    session::Session,
};

mod common;

fn settings(mode: RouterMode) -> RouterSettings {
    RouterSettings {
        mode,
        time_limit_ms: None,
        ..Default::default()
    }
}

fn crossing_track() -> pnsroute::node::item::Item {
    common::seg(point! {x: 50, y: -30}, point! {x: 50, y: 30}, 10, 0, 2)
}

#[test]
fn test_direct_line_on_empty_board() {
    let (board, _) = common::make_board(1, 2, vec![]);
    let mut session = Session::new(
        board,
        ClearanceRules::uniform(5),
        settings(RouterMode::Shove),
    );

    session.start_route(common::origin(), 0, 1, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert_eq!(placement.state, PlacerState::Routing);
    assert_eq!(placement.line.segment_count(), 1);
    assert_eq!(placement.line.length(), 100.0);
    assert!(!placement.timed_out);
    assert!(session.is_committable());

    let summary = session.finish().unwrap();
    assert_eq!(summary.added.len(), 1);
    assert_eq!(session.arena().len(session.arena().root()), 1);
}

#[test]
fn test_walkaround_crossing_track() {
    let (board, _) = common::make_board(1, 3, vec![crossing_track()]);
    let rules = ClearanceRules::uniform(5);
    let mut session = Session::new(board, rules.clone(), settings(RouterMode::Walkaround));

    session.start_route(common::origin(), 0, 1, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert_eq!(placement.state, PlacerState::Walkaround);
    assert!(placement.line.segment_count() >= 3);
    assert!(placement.violations.is_empty());
    assert_eq!(placement.line.start(), Some(common::origin()));
    assert_eq!(placement.line.end(), Some(point! {x: 100, y: 0}));
    common::assert_clearances(session.arena(), session.preview_node(), &rules);
}

#[test]
fn test_locked_track_is_walked_around_in_shove_mode() {
    let (board, _) = common::make_board(
        1,
        3,
        vec![common::locked_seg(
            point! {x: 50, y: -30},
            point! {x: 50, y: 30},
            10,
            0,
            2,
        )],
    );
    let rules = ClearanceRules::uniform(5);
    let mut session = Session::new(board, rules.clone(), settings(RouterMode::Shove));

    session.start_route(common::origin(), 0, 1, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert_eq!(placement.state, PlacerState::Walkaround);
    assert!(placement.shoved.is_empty());
    assert!(placement.line.segment_count() >= 3);
    common::assert_clearances(session.arena(), session.preview_node(), &rules);
}

#[test]
fn test_shove_between_parallel_tracks() {
    let (board, ids) = common::make_board(
        1,
        4,
        vec![
            common::seg(point! {x: -50, y: 6}, point! {x: 150, y: 6}, 2, 0, 1),
            common::seg(point! {x: -50, y: -6}, point! {x: 150, y: -6}, 2, 0, 2),
        ],
    );
    let rules = ClearanceRules::uniform(5);
    let mut session = Session::with_observer(
        board,
        rules.clone(),
        settings(RouterMode::Shove),
        common::Recorder::default(),
    );

    session.start_route(common::origin(), 0, 3, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert_eq!(placement.state, PlacerState::Shove);
    assert_eq!(placement.line.segment_count(), 1);
    assert!(!placement.shoved.is_empty());

    let shoved: Vec<_> = session
        .observer()
        .shoves
        .iter()
        .map(|(item, _)| *item)
        .collect();
    assert!(shoved.contains(&ids[0]));
    assert!(shoved.contains(&ids[1]));

    // Displaced tracks keep their clearance from the new line and from each other.
    common::assert_clearances(session.arena(), session.preview_node(), &rules);

    // Nothing reaches the board before the gesture is finished.
    let root = session.arena().root();
    assert!(session.arena().item(root, ids[0]).unwrap().is_some());

    session.finish().unwrap();
    assert!(session.arena().item(root, ids[0]).unwrap().is_none());
    common::assert_clearances(session.arena(), root, &rules);
    common::assert_connected(
        session.arena(),
        root,
        1,
        point! {x: -50, y: 6},
        point! {x: 150, y: 6},
    );
}

/// Lowest and highest y reached by the items of `net`.
fn net_y_range(arena: &NodeArena, node: NodeHandle, net: usize) -> (i64, i64) {
    let ys: Vec<i64> = arena
        .items(node)
        .unwrap()
        .into_values()
        .filter(|item| item.maybe_net() == Some(net))
        .flat_map(|item| item.anchors())
        .map(|p| p.y())
        .collect();

    (
        ys.iter().copied().min().unwrap(),
        ys.iter().copied().max().unwrap(),
    )
}

#[test]
fn test_off_centre_shove_pushes_sides_unevenly() {
    let (board, _) = common::make_board(
        1,
        4,
        vec![
            common::seg(point! {x: -50, y: 6}, point! {x: 150, y: 6}, 2, 0, 1),
            common::seg(point! {x: -50, y: -6}, point! {x: 150, y: -6}, 2, 0, 2),
        ],
    );
    let rules = ClearanceRules::uniform(5);
    let mut session = Session::new(board, rules.clone(), settings(RouterMode::Shove));

    // The line rises towards the upper track, which has to give way further.
    session.start_route(common::origin(), 0, 3, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 2}).unwrap();

    assert_eq!(placement.state, PlacerState::Shove);
    assert_eq!(placement.line.segment_count(), 1);

    let node = session.preview_node();
    common::assert_clearances(session.arena(), node, &rules);

    let (_, upper_top) = net_y_range(session.arena(), node, 1);
    let (lower_bottom, _) = net_y_range(session.arena(), node, 2);
    assert_eq!(upper_top, 10);
    assert_eq!(lower_bottom, -8);
    assert!(upper_top - 6 > -6 - lower_bottom);

    // Away from the new line both tracks stay where they were.
    assert_eq!(net_y_range(session.arena(), node, 1).0, 6);
    assert_eq!(net_y_range(session.arena(), node, 2).1, -6);
}

#[test]
fn test_shove_depth_limit_falls_back() {
    let (board, _) = common::make_board(
        1,
        6,
        vec![
            common::seg(point! {x: -50, y: 6}, point! {x: 150, y: 6}, 2, 0, 1),
            // Wherever the first track goes, it ends up too close to one of these.
            common::seg(point! {x: -50, y: 14}, point! {x: 150, y: 14}, 2, 0, 4),
            common::seg(point! {x: -50, y: -14}, point! {x: 150, y: -14}, 2, 0, 5),
        ],
    );
    let settings = RouterSettings {
        shove_max_depth: 1,
        ..settings(RouterMode::Shove)
    };
    let mut session = Session::with_observer(
        board,
        ClearanceRules::uniform(5),
        settings,
        common::Recorder::default(),
    );

    session.start_route(common::origin(), 0, 3, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert!(matches!(
        placement.state,
        PlacerState::Walkaround | PlacerState::MarkObstacle
    ));
    assert!(placement.shoved.is_empty());
    assert!(session
        .observer()
        .shoves
        .iter()
        .all(|(_, depth)| *depth <= 1));
}

#[test]
fn test_zero_time_limit_marks_direct_line() {
    let (board, ids) = common::make_board(1, 3, vec![crossing_track()]);
    let settings = RouterSettings {
        time_limit_ms: Some(0),
        ..Default::default()
    };
    let mut session = Session::new(board, ClearanceRules::uniform(5), settings);

    session.start_route(common::origin(), 0, 1, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert!(placement.timed_out);
    assert_eq!(placement.state, PlacerState::MarkObstacle);
    assert_eq!(placement.line.segment_count(), 1);
    assert_eq!(placement.violations.len(), 1);
    assert_eq!(placement.violations[0].item, ids[0]);
    assert!(!session.is_committable());
    assert_eq!(session.violations().len(), 1);
}

#[test]
fn test_mark_obstacles_mode() {
    let (board, ids) = common::make_board(1, 3, vec![crossing_track()]);
    let mut session = Session::with_observer(
        board,
        ClearanceRules::uniform(5),
        settings(RouterMode::MarkObstacles),
        common::Recorder::default(),
    );

    session.start_route(common::origin(), 0, 1, 2).unwrap();
    let placement = session.move_to(point! {x: 100, y: 0}).unwrap();

    assert_eq!(placement.state, PlacerState::MarkObstacle);
    assert_eq!(session.observer().marked, vec![ids[0]]);

    // A marked line can still be committed; the violation stays visible on the board.
    let summary = session.finish().unwrap();
    assert_eq!(summary.added.len(), 1);
}
