use std::ffi::CString;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use gdal::config;
use gdal_sys::{CPLErr, CPLError};
use st_lucas::config::route_gdal_errors_to_tracing;
use tracing::field::{Field, Visit};
use tracing::{span, Event, Level, Metadata, Subscriber};

type Records = Arc<Mutex<Vec<(Level, String)>>>;

/// Subscriber keeping the level and message of every event.
#[derive(Clone, Default)]
struct Recorder {
    records: Records,
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl Subscriber for Recorder {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.records
                .lock()
                .unwrap()
                .push((*event.metadata().level(), message));
        }
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

fn raise(class: CPLErr::Type, number: i32, msg: &str) {
    let msg = CString::new(msg).unwrap();
    unsafe { CPLError(class, number, msg.as_ptr()) };
}

#[test]
fn test_route_gdal_errors_to_tracing() {
    let recorder = Recorder::default();
    let records = recorder.records.clone();
    let guard = tracing::subscriber::set_default(recorder);

    route_gdal_errors_to_tracing();
    raise(CPLErr::CE_Failure, 42, "foo");
    raise(CPLErr::CE_Warning, 1, "bar");
    config::remove_error_handler();
    drop(guard);

    let records = records.lock().unwrap().clone();
    assert_eq!(
        records,
        vec![
            (Level::ERROR, "GDAL: foo".to_string()),
            (Level::WARN, "GDAL: bar".to_string()),
        ]
    );
}
