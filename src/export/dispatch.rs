//! Fan-out of one event stream to several consumers.

use log::{debug, warn};

use super::{Consumer, Format, Stats};
use crate::error::{Error, Result};
use crate::ir::Event;
use crate::stream::CancelToken;

/// The finished output of one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub format: &'static str,
    pub content_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    pub is_text: bool,
    pub bytes: Vec<u8>,
    /// What this consumer saw.
    pub stats: Stats,
}

impl Output {
    /// The output as UTF-8 text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        if self.is_text {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }
}

/// Drives one event sequence into any number of consumers.
///
/// Events reach the consumers in generation order, each consumer in
/// registration order. The first consumer error aborts the whole run.
#[derive(Default)]
pub struct Dispatcher {
    consumers: Vec<Box<dyn Consumer>>,
    stats: Stats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumer(mut self, consumer: impl Consumer + 'static) -> Self {
        self.add(Box::new(consumer));
        self
    }

    /// Add the default consumer for `format`.
    pub fn with_format(mut self, format: Format) -> Self {
        self.add(format.consumer());
        self
    }

    pub fn add(&mut self, consumer: Box<dyn Consumer>) {
        self.consumers.push(consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Aggregate counters of the last run.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Feed `events` to every consumer and collect their outputs.
    ///
    /// On a consumer error the token is cancelled, all partial output is
    /// discarded and [`Error::Consumer`] is returned. A stream that ends
    /// without `EndDocument` because `cancel` fired yields
    /// [`Error::Cancelled`].
    pub fn run<I>(&mut self, events: I, cancel: &CancelToken) -> Result<Vec<Output>>
    where
        I: IntoIterator<Item = Event>,
    {
        self.reset();

        let mut finished = false;
        for event in events {
            self.stats.record(&event);
            finished = matches!(event, Event::EndDocument);
            if let Err(err) = broadcast(&mut self.consumers, &event) {
                cancel.cancel();
                self.reset();
                return Err(err);
            }
        }

        if !finished {
            self.reset();
            if cancel.is_cancelled() {
                debug!("dispatch cancelled after {} events", self.stats.events);
                return Err(Error::Cancelled);
            }
            return Err(Error::unbalanced("dispatcher", "EndDocument", "end of input"));
        }

        let mut outputs = Vec::with_capacity(self.consumers.len());
        for index in 0..self.consumers.len() {
            let consumer = &mut self.consumers[index];
            let stats = *consumer.stats();
            match consumer.flush() {
                Ok(bytes) => outputs.push(Output {
                    format: consumer.name(),
                    content_type: consumer.content_type(),
                    extension: consumer.extension(),
                    is_text: consumer.is_text(),
                    bytes,
                    stats,
                }),
                Err(err) => {
                    let err = consumer_error(consumer.name(), err);
                    cancel.cancel();
                    self.reset();
                    return Err(err);
                }
            }
        }

        debug!("dispatched {} to {} consumers", self.stats, outputs.len());
        Ok(outputs)
    }

    fn reset(&mut self) {
        for consumer in &mut self.consumers {
            consumer.reset();
        }
        self.stats = Stats::new();
    }
}

fn broadcast(consumers: &mut [Box<dyn Consumer>], event: &Event) -> Result<()> {
    for consumer in consumers.iter_mut() {
        consumer
            .handle(event)
            .map_err(|err| consumer_error(consumer.name(), err))?;
    }
    Ok(())
}

fn consumer_error(format: &str, source: Error) -> Error {
    warn!("{format} consumer failed: {source}");
    Error::Consumer {
        format: format.to_string(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DocumentInfo;

    fn document(title: &str) -> Vec<Event> {
        vec![
            Event::StartDocument(Box::new(DocumentInfo {
                title: title.into(),
                ..DocumentInfo::default()
            })),
            Event::StartParagraph,
            Event::text("hello"),
            Event::EndParagraph,
            Event::EndDocument,
        ]
    }

    #[test]
    fn test_outputs_in_registration_order() {
        let mut dispatcher = Dispatcher::new()
            .with_format(Format::Text)
            .with_format(Format::Html);
        let outputs = dispatcher
            .run(document("T"), &CancelToken::new())
            .expect("run");

        let formats: Vec<&str> = outputs.iter().map(|o| o.format).collect();
        assert_eq!(formats, vec!["text", "html"]);
        assert_eq!(outputs[0].as_str(), Some("T\n=\n\nhello\n"));
        assert_eq!(outputs[1].stats.events, 5);
        assert_eq!(dispatcher.stats().text_bytes, 5);
    }

    #[test]
    fn test_unbalanced_stream_fails_with_consumer_error() {
        let mut events = document("T");
        events.insert(2, Event::EndList);
        let cancel = CancelToken::new();

        let mut dispatcher = Dispatcher::new().with_format(Format::Markdown);
        let err = dispatcher.run(events, &cancel).expect_err("unbalanced");

        assert!(matches!(err, Error::Consumer { ref format, .. } if format == "markdown"));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_truncated_stream_after_cancel() {
        let mut events = document("T");
        events.truncate(3);
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut dispatcher = Dispatcher::new().with_format(Format::Html);
        assert!(matches!(dispatcher.run(events, &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn test_truncated_stream_without_cancel() {
        let mut events = document("T");
        events.pop();

        let mut dispatcher = Dispatcher::new().with_format(Format::Html);
        let err = dispatcher
            .run(events, &CancelToken::new())
            .expect_err("no EndDocument");
        assert!(matches!(err, Error::Unbalanced { .. }));
    }

    #[test]
    fn test_dispatcher_is_reusable() {
        let mut dispatcher = Dispatcher::new().with_format(Format::Text);
        let cancel = CancelToken::new();
        let first = dispatcher.run(document("A"), &cancel).expect("first");
        let second = dispatcher.run(document("A"), &cancel).expect("second");
        assert_eq!(first, second);
    }
}
