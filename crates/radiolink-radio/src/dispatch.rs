use std::fmt;

use radiolink_frame::{decode_message, Frame, Message, MessageKind, Text};
use radiolink_queue::Handler;
use serde::Serialize;
use tracing::{debug, trace};

type Route = Box<dyn FnMut(&Message<'_>, &Frame) + Send>;
type Fallback = Box<dyn FnMut(&Frame) + Send>;

/// What happened to one dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decoded and passed to the handler registered for its kind.
    Delivered(MessageKind),
    /// Decoded, but no handler is registered for its kind.
    Unhandled(MessageKind),
    /// Not a decodable datagram; passed to the fallback.
    Fallback,
    /// Not a decodable datagram, and no fallback is registered.
    Discarded,
}

/// Running totals kept by a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchCounts {
    pub delivered: u64,
    pub unhandled: u64,
    pub fallback: u64,
}

/// Routes received frames to per-kind handlers.
///
/// Each [`MessageKind`] has at most one handler. Frames that are not valid
/// datagrams (foreign protocol or version, unknown type tag, payload shorter
/// than its tag requires) go to the fallback with the raw frame.
#[derive(Default)]
pub struct Dispatcher {
    routes: [Option<Route>; 5],
    fallback: Option<Fallback>,
    counts: DispatchCounts,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle plain integers.
    pub fn on_int(&mut self, mut handler: impl FnMut(i32) + Send + 'static) -> &mut Self {
        self.route(MessageKind::Int, move |message, _| {
            if let Message::Int { value } = *message {
                handler(value);
            }
        })
    }

    /// Handle plain doubles.
    pub fn on_double(&mut self, mut handler: impl FnMut(f64) + Send + 'static) -> &mut Self {
        self.route(MessageKind::Double, move |message, _| {
            if let Message::Double { value } = *message {
                handler(value);
            }
        })
    }

    /// Handle strings. The text borrows from the receive buffer and is only
    /// valid for the duration of the call.
    pub fn on_string(
        &mut self,
        mut handler: impl FnMut(Text<'_>) + Send + 'static,
    ) -> &mut Self {
        self.route(MessageKind::String, move |message, _| {
            if let Message::String { text } = *message {
                handler(text);
            }
        })
    }

    /// Handle keyed integers, called with `(value, key)`.
    pub fn on_keyed_int(
        &mut self,
        mut handler: impl FnMut(i32, Text<'_>) + Send + 'static,
    ) -> &mut Self {
        self.route(MessageKind::KeyedInt, move |message, _| {
            if let Message::KeyedInt { key, value } = *message {
                handler(value, key);
            }
        })
    }

    /// Handle keyed doubles, called with `(value, key)`.
    pub fn on_keyed_double(
        &mut self,
        mut handler: impl FnMut(f64, Text<'_>) + Send + 'static,
    ) -> &mut Self {
        self.route(MessageKind::KeyedDouble, move |message, _| {
            if let Message::KeyedDouble { key, value } = *message {
                handler(value, key);
            }
        })
    }

    /// Handle every decoded message of `kind`, along with the frame it came
    /// in (for its group and RSSI).
    pub fn on_message(
        &mut self,
        kind: MessageKind,
        handler: impl FnMut(&Message<'_>, &Frame) + Send + 'static,
    ) -> &mut Self {
        self.route(kind, handler)
    }

    /// Handle frames that do not decode as datagrams.
    pub fn on_unknown(&mut self, handler: impl FnMut(&Frame) + Send + 'static) -> &mut Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Remove the handler for `kind`; its messages are dropped from now on.
    pub fn clear(&mut self, kind: MessageKind) -> &mut Self {
        self.routes[kind.index()] = None;
        self
    }

    pub fn clear_unknown(&mut self) -> &mut Self {
        self.fallback = None;
        self
    }

    pub fn is_registered(&self, kind: MessageKind) -> bool {
        self.routes[kind.index()].is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn counts(&self) -> DispatchCounts {
        self.counts
    }

    /// Decode one frame and invoke at most one handler.
    pub fn dispatch(&mut self, frame: &Frame) -> Dispatch {
        match decode_message(frame) {
            Ok(message) => {
                let kind = message.kind();
                match &mut self.routes[kind.index()] {
                    Some(route) => {
                        route(&message, frame);
                        self.counts.delivered += 1;
                        trace!(kind = kind.name(), rssi = frame.rssi(), "datagram delivered");
                        Dispatch::Delivered(kind)
                    }
                    None => {
                        self.counts.unhandled += 1;
                        trace!(kind = kind.name(), "no handler registered; datagram dropped");
                        Dispatch::Unhandled(kind)
                    }
                }
            }
            Err(err) => {
                self.counts.fallback += 1;
                debug!(
                    error = %err,
                    protocol = frame.protocol(),
                    version = frame.version(),
                    "frame is not a decodable datagram"
                );
                match &mut self.fallback {
                    Some(fallback) => {
                        fallback(frame);
                        Dispatch::Fallback
                    }
                    None => Dispatch::Discarded,
                }
            }
        }
    }

    fn route(
        &mut self,
        kind: MessageKind,
        handler: impl FnMut(&Message<'_>, &Frame) + Send + 'static,
    ) -> &mut Self {
        self.routes[kind.index()] = Some(Box::new(handler));
        self
    }
}

impl Handler<Frame> for Dispatcher {
    fn handle(&mut self, frame: &Frame) {
        self.dispatch(frame);
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&str> = MessageKind::ALL
            .iter()
            .filter(|kind| self.is_registered(**kind))
            .map(|kind| kind.name())
            .collect();
        f.debug_struct("Dispatcher")
            .field("registered", &registered)
            .field("fallback", &self.has_fallback())
            .field("counts", &self.counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radiolink_frame::encode_message;
    use std::sync::{Arc, Mutex};

    fn datagram(message: Message<'_>) -> Frame {
        let mut frame = Frame::new(111);
        encode_message(&mut frame, &message).expect("message should fit");
        frame
    }

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&log), log)
    }

    #[test]
    fn int_reaches_int_handler_only() {
        let (ints, sink) = recorder();
        let (doubles, double_sink) = recorder::<f64>();
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on_int(move |v| sink.lock().unwrap().push(v))
            .on_double(move |v| double_sink.lock().unwrap().push(v));

        let outcome = dispatcher.dispatch(&datagram(Message::number(42)));

        assert_eq!(outcome, Dispatch::Delivered(MessageKind::Int));
        assert_eq!(*ints.lock().unwrap(), [42]);
        assert!(doubles.lock().unwrap().is_empty());
    }

    #[test]
    fn keyed_handler_receives_value_then_key() {
        let (seen, sink) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_keyed_double(move |value, key| {
            sink.lock().unwrap().push((value, key.to_string()));
        });

        dispatcher.dispatch(&datagram(Message::keyed("k", 3.5)));

        assert_eq!(*seen.lock().unwrap(), [(3.5, "k".to_string())]);
    }

    #[test]
    fn string_and_keyed_int_handlers() {
        let (strings, string_sink) = recorder();
        let (keyed, keyed_sink) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .on_string(move |text| string_sink.lock().unwrap().push(text.to_string()))
            .on_keyed_int(move |value, key| {
                keyed_sink.lock().unwrap().push((value, key.to_string()))
            });

        dispatcher.dispatch(&datagram(Message::string("hi")));
        dispatcher.dispatch(&datagram(Message::keyed("n", -3)));

        assert_eq!(*strings.lock().unwrap(), ["hi"]);
        assert_eq!(*keyed.lock().unwrap(), [(-3, "n".to_string())]);
    }

    #[test]
    fn unknown_tag_only_reaches_fallback() {
        let (typed, typed_sink) = recorder::<&'static str>();
        let (unknown, unknown_sink) = recorder();
        let mut dispatcher = Dispatcher::new();
        for kind in MessageKind::ALL {
            let sink = Arc::clone(&typed_sink);
            dispatcher.on_message(kind, move |_, _| sink.lock().unwrap().push(kind.name()));
        }
        dispatcher.on_unknown(move |frame| unknown_sink.lock().unwrap().push(frame.payload()[0]));

        let mut frame = Frame::new(111);
        frame.payload_mut()[0] = 99;
        frame.set_payload_len(1).expect("payload length should fit");

        assert_eq!(dispatcher.dispatch(&frame), Dispatch::Fallback);
        assert!(typed.lock().unwrap().is_empty());
        assert_eq!(*unknown.lock().unwrap(), [99]);
    }

    #[test]
    fn foreign_protocol_goes_to_fallback() {
        let (unknown, sink) = recorder();
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_unknown(move |frame| sink.lock().unwrap().push(frame.protocol()));

        let mut frame = datagram(Message::number(1));
        frame.set_protocol(2);

        assert_eq!(dispatcher.dispatch(&frame), Dispatch::Fallback);
        assert_eq!(*unknown.lock().unwrap(), [2]);
        assert_eq!(dispatcher.counts().fallback, 1);
    }

    #[test]
    fn missing_handlers_drop_silently() {
        let mut dispatcher = Dispatcher::new();
        assert!(!dispatcher.is_registered(MessageKind::String));
        assert!(!dispatcher.has_fallback());

        assert_eq!(
            dispatcher.dispatch(&datagram(Message::string("lost"))),
            Dispatch::Unhandled(MessageKind::String)
        );

        let mut frame = Frame::new(1);
        frame.set_protocol(7);
        assert_eq!(dispatcher.dispatch(&frame), Dispatch::Discarded);

        assert_eq!(
            dispatcher.counts(),
            DispatchCounts {
                delivered: 0,
                unhandled: 1,
                fallback: 1
            }
        );
    }

    #[test]
    fn clear_unregisters() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.on_int(|_| {});
        assert!(dispatcher.is_registered(MessageKind::Int));

        dispatcher.clear(MessageKind::Int);
        assert!(!dispatcher.is_registered(MessageKind::Int));
        assert_eq!(
            dispatcher.dispatch(&datagram(Message::number(5))),
            Dispatch::Unhandled(MessageKind::Int)
        );
    }
}
