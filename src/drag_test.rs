use super::*;

#[test]
fn default_is_idle() {
    let drag = DragController::new();
    assert_eq!(drag.state(), &DragState::Idle);
    assert!(!drag.is_dragging());
}

#[test]
fn move_while_idle_is_none() {
    let drag = DragController::new();
    assert!(drag.pointer_move(Point::new(1.0, 1.0)).is_none());
}

#[test]
fn pointer_down_records_offset() {
    let mut drag = DragController::new();
    drag.pointer_down(LayerId::from("a"), Point::new(150.0, 150.0), Point::new(140.0, 140.0));
    assert_eq!(
        drag.state(),
        &DragState::Dragging { id: LayerId::from("a"), offset: Point::new(10.0, 10.0) }
    );
}

#[test]
fn move_subtracts_offset() {
    let mut drag = DragController::new();
    drag.pointer_down(LayerId::from("a"), Point::new(150.0, 150.0), Point::new(140.0, 140.0));
    let (id, at) = drag.pointer_move(Point::new(200.0, 180.0)).unwrap();
    assert_eq!(id, &LayerId::from("a"));
    assert_eq!(at, Point::new(190.0, 170.0));
}

#[test]
fn movement_is_unbounded() {
    let mut drag = DragController::new();
    drag.pointer_down(LayerId::from("a"), Point::new(5.0, 5.0), Point::new(0.0, 0.0));
    let (_, at) = drag.pointer_move(Point::new(-100.0, 10_000.0)).unwrap();
    assert_eq!(at, Point::new(-105.0, 9_995.0));
}

#[test]
fn every_terminal_event_returns_to_idle() {
    for reason in [DragEnd::PointerUp, DragEnd::PointerCancel, DragEnd::PointerLeave] {
        let mut drag = DragController::new();
        drag.pointer_down(LayerId::from("a"), Point::default(), Point::default());
        assert_eq!(drag.end(reason), Some(LayerId::from("a")));
        assert!(!drag.is_dragging());
        assert!(drag.pointer_move(Point::new(1.0, 1.0)).is_none());
    }
}

#[test]
fn end_while_idle_is_none() {
    let mut drag = DragController::new();
    assert_eq!(drag.end(DragEnd::PointerUp), None);
}
