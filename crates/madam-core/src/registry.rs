use std::io::{Read, Seek, SeekFrom};

use madam_types::{Asset, Metadata, MetadataValue};
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::processor::{Capability, MetadataProcessor, Processor, Registration};

struct ReaderEntry {
    priority: i32,
    processor: Box<dyn Processor>,
}

struct MetadataEntry {
    priority: i32,
    processor: Box<dyn MetadataProcessor>,
}

/// Ordered collection of processors with content-sniffing dispatch.
///
/// Readers are probed in order of descending priority; among equal
/// priorities, registration order decides. Dispatch short-circuits on the
/// first processor whose probe accepts the input, so permissive sniffers
/// belong after strict ones.
///
/// Metadata processors are never probed. They are routed by the namespace
/// names they declare.
pub struct ProcessorRegistry {
    readers: Vec<ReaderEntry>,
    metadata: Vec<MetadataEntry>,
    config: RegistryConfig,
}

impl ProcessorRegistry {
    /// Create an empty registry with the given configuration.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            readers: Vec::new(),
            metadata: Vec::new(),
            config,
        }
    }

    /// The current configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ---- Registration ----

    /// Register a reader after all readers registered so far.
    pub fn register_reader(&mut self, processor: Box<dyn Processor>) {
        self.register_reader_with_priority(processor, 0);
    }

    /// Register a reader ahead of every reader with a lower priority.
    pub fn register_reader_with_priority(&mut self, processor: Box<dyn Processor>, priority: i32) {
        let at = self
            .readers
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.readers.len());
        debug!(processor = processor.name(), priority, index = at, "registered reader");
        self.readers.insert(at, ReaderEntry { priority, processor });
    }

    /// Register a metadata processor after all metadata processors so far.
    pub fn register_metadata(&mut self, processor: Box<dyn MetadataProcessor>) {
        self.register_metadata_with_priority(processor, 0);
    }

    /// Register a metadata processor ahead of every one with a lower
    /// priority. When two processors declare the same namespace, the first
    /// in this order owns it.
    pub fn register_metadata_with_priority(
        &mut self,
        processor: Box<dyn MetadataProcessor>,
        priority: i32,
    ) {
        let at = self
            .metadata
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.metadata.len());
        debug!(
            processor = processor.name(),
            namespaces = ?processor.namespaces(),
            priority,
            "registered metadata processor"
        );
        self.metadata.insert(at, MetadataEntry { priority, processor });
    }

    /// Number of registered readers.
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Number of registered metadata processors.
    pub fn metadata_count(&self) -> usize {
        self.metadata.len()
    }

    /// Every registration in dispatch order: readers first, then one entry
    /// per declared metadata namespace.
    pub fn registrations(&self) -> Vec<Registration> {
        let readers = self.readers.iter().map(|e| Registration {
            name: e.processor.name().to_string(),
            capability: Capability::Reader,
            priority: e.priority,
        });
        let metadata = self.metadata.iter().flat_map(|e| {
            e.processor.namespaces().iter().map(move |ns| Registration {
                name: e.processor.name().to_string(),
                capability: Capability::Metadata((*ns).to_string()),
                priority: e.priority,
            })
        });
        readers.chain(metadata).collect()
    }

    /// All mime types the registered readers can produce, deduplicated, in
    /// dispatch order.
    pub fn supported_mime_types(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for entry in &self.readers {
            for mime in entry.processor.mime_types() {
                if !out.contains(mime) {
                    out.push(*mime);
                }
            }
        }
        out
    }

    // ---- Reader dispatch ----

    /// Names of every reader whose probe accepts `data`, in dispatch order.
    ///
    /// Nothing is extracted.
    pub fn candidates(&self, data: &[u8]) -> Vec<&str> {
        self.readers
            .iter()
            .filter(|e| e.processor.probe(data))
            .map(|e| e.processor.name())
            .collect()
    }

    /// The reader that would handle `data`, if any.
    pub fn probe(&self, data: &[u8]) -> Option<&dyn Processor> {
        self.readers
            .iter()
            .find(|e| e.processor.probe(data))
            .map(|e| e.processor.as_ref())
    }

    /// Identify `data` and extract an asset from it.
    ///
    /// The first reader whose probe accepts performs the extraction. If that
    /// extraction fails, the error is returned as is; later candidates are not
    /// tried.
    pub fn read(&self, data: &[u8]) -> ProcessorResult<Asset> {
        self.check_size(data.len() as u64)?;

        for entry in &self.readers {
            let name = entry.processor.name();
            if !entry.processor.probe(data) {
                debug!(processor = name, "probe rejected input");
                continue;
            }
            debug!(processor = name, len = data.len(), "probe accepted input");

            let mut asset = entry.processor.extract(data).map_err(|e| {
                warn!(processor = name, error = %e, "extraction failed after successful probe");
                e
            })?;

            if self.config.attach_metadata {
                self.attach_metadata(&mut asset, data);
            }
            return Ok(asset);
        }

        debug!(len = data.len(), readers = self.readers.len(), "no reader accepted input");
        Err(ProcessorError::UnrecognizedFormat)
    }

    /// Buffer a reader fully, then dispatch it like [`Self::read`].
    pub fn read_from<R: Read>(&self, reader: R) -> ProcessorResult<Asset> {
        let data = self.buffer(reader)?;
        self.read(&data)
    }

    /// Buffer a seekable stream from its current position and dispatch it.
    ///
    /// The stream is rewound to where it started on every exit path,
    /// including failures.
    pub fn read_stream<S: Read + Seek>(&self, stream: &mut S) -> ProcessorResult<Asset> {
        let start = stream.stream_position()?;
        let result = self.buffer(&mut *stream).and_then(|data| self.read(&data));
        let rewound = stream.seek(SeekFrom::Start(start));
        match (result, rewound) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e.into()),
            (Ok(asset), Ok(_)) => Ok(asset),
        }
    }

    fn buffer<R: Read>(&self, reader: R) -> ProcessorResult<Vec<u8>> {
        let limit = self.config.max_input_bytes;
        let mut data = Vec::new();
        reader.take(limit.saturating_add(1)).read_to_end(&mut data)?;
        self.check_size(data.len() as u64)?;
        Ok(data)
    }

    fn check_size(&self, actual: u64) -> ProcessorResult<()> {
        let limit = self.config.max_input_bytes;
        if actual > limit {
            return Err(ProcessorError::InputTooLarge { limit, actual });
        }
        Ok(())
    }

    /// Read every namespace scoped to the asset's mime type and attach the
    /// non-empty payloads. A namespace that fails to read is skipped; the
    /// extraction itself already succeeded.
    fn attach_metadata(&self, asset: &mut Asset, data: &[u8]) {
        let Some(mime) = asset.mime_type().map(str::to_owned) else {
            return;
        };
        for entry in &self.metadata {
            let processor = &entry.processor;
            if !processor.mime_types().contains(&mime.as_str()) {
                continue;
            }
            match processor.read(data) {
                Ok(namespaces) => {
                    for (ns, payload) in namespaces {
                        if payload.is_empty_map() || asset.get(&ns).is_some() {
                            continue;
                        }
                        debug!(processor = processor.name(), namespace = %ns, "attached metadata");
                        asset.insert(ns, payload);
                    }
                }
                Err(e) => {
                    warn!(processor = processor.name(), error = %e, "skipping unreadable metadata");
                }
            }
        }
    }

    // ---- Metadata routing ----

    /// The metadata processor owning `namespace`.
    pub fn metadata_processor(&self, namespace: &str) -> ProcessorResult<&dyn MetadataProcessor> {
        self.metadata
            .iter()
            .find(|e| e.processor.namespaces().contains(&namespace))
            .map(|e| e.processor.as_ref())
            .ok_or_else(|| ProcessorError::UnknownNamespace(namespace.to_string()))
    }

    /// Read one namespace. The result maps `namespace` to its payload, which
    /// is empty when the container carries no such metadata.
    pub fn read_metadata(&self, data: &[u8], namespace: &str) -> ProcessorResult<Metadata> {
        let processor = self.metadata_processor(namespace)?;
        let mut all = processor.read(data)?;
        let payload = all
            .remove(namespace)
            .unwrap_or_else(MetadataValue::empty_map);
        let mut out = Metadata::new();
        out.insert(namespace.to_string(), payload);
        Ok(out)
    }

    /// Remove one namespace from the container.
    pub fn strip_metadata(&self, data: &[u8], namespace: &str) -> ProcessorResult<Vec<u8>> {
        let processor = self.metadata_processor(namespace)?;
        debug!(processor = processor.name(), namespace, "stripping metadata");
        processor.strip(data)
    }

    /// Remove every namespace understood for `mime_type`.
    pub fn strip_all(&self, data: &[u8], mime_type: &str) -> ProcessorResult<Vec<u8>> {
        let mut current = data.to_vec();
        for entry in &self.metadata {
            if entry.processor.mime_types().contains(&mime_type) {
                current = entry.processor.strip(&current)?;
            }
        }
        Ok(current)
    }

    /// Inject every registered namespace present in `metadata`, in key order.
    ///
    /// Keys that are not registered namespaces (such as `mime_type`) are
    /// ignored. A mapping without any registered namespace is a validation
    /// error.
    pub fn combine_metadata(&self, data: &[u8], metadata: &Metadata) -> ProcessorResult<Vec<u8>> {
        if metadata.is_empty() {
            return Err(ProcessorError::validation("no metadata provided"));
        }

        let mut current: Option<Vec<u8>> = None;
        for (key, payload) in metadata {
            let Ok(processor) = self.metadata_processor(key) else {
                continue;
            };
            let mut single = Metadata::new();
            single.insert(key.clone(), payload.clone());

            debug!(processor = processor.name(), namespace = %key, "combining metadata");
            let input = current.as_deref().unwrap_or(data);
            current = Some(processor.combine(input, &single)?);
        }

        current.ok_or_else(|| {
            ProcessorError::validation("metadata contains no registered namespace")
        })
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("readers", &self.readers.len())
            .field("metadata", &self.metadata.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use madam_types::mime::MIME_TYPE_KEY;

    use super::*;
    use crate::processor::require_namespace;

    // -----------------------------------------------------------------------
    // Test processors
    // -----------------------------------------------------------------------

    /// Accepts input starting with a fixed magic prefix.
    struct MagicProcessor {
        name: &'static str,
        magic: &'static [u8],
        mime: &'static [&'static str],
    }

    impl Processor for MagicProcessor {
        fn name(&self) -> &str {
            self.name
        }

        fn mime_types(&self) -> &[&'static str] {
            self.mime
        }

        fn probe(&self, data: &[u8]) -> bool {
            data.starts_with(self.magic)
        }

        fn extract(&self, data: &[u8]) -> ProcessorResult<Asset> {
            let essence = data[self.magic.len()..].to_vec();
            Ok(Asset::new(essence, Metadata::new())
                .with(MIME_TYPE_KEY, self.mime[0])
                .with("reader", self.name))
        }
    }

    fn magic(name: &'static str, magic: &'static [u8]) -> Box<dyn Processor> {
        let mime: &'static [&'static str] = match name {
            "alpha" => &["test/alpha"],
            "beta" => &["test/beta"],
            _ => &["test/any"],
        };
        Box::new(MagicProcessor { name, magic, mime })
    }

    /// Passes every probe, fails every extraction.
    struct BrokenProcessor;

    impl Processor for BrokenProcessor {
        fn name(&self) -> &str {
            "broken"
        }

        fn mime_types(&self) -> &[&'static str] {
            &["test/broken"]
        }

        fn probe(&self, _data: &[u8]) -> bool {
            true
        }

        fn extract(&self, _data: &[u8]) -> ProcessorResult<Asset> {
            Err(ProcessorError::unsupported("truncated payload"))
        }
    }

    /// Owns the "note" namespace: an optional first line `#note:<text>\n`.
    struct NoteProcessor;

    const NOTE_PREFIX: &[u8] = b"#note:";

    impl NoteProcessor {
        fn split(data: &[u8]) -> (Option<&[u8]>, &[u8]) {
            if !data.starts_with(NOTE_PREFIX) {
                return (None, data);
            }
            match data.iter().position(|&b| b == b'\n') {
                Some(end) => (Some(&data[NOTE_PREFIX.len()..end]), &data[end + 1..]),
                None => (Some(&data[NOTE_PREFIX.len()..]), &[]),
            }
        }
    }

    impl MetadataProcessor for NoteProcessor {
        fn name(&self) -> &str {
            "note"
        }

        fn namespaces(&self) -> &[&'static str] {
            &["note"]
        }

        fn mime_types(&self) -> &[&'static str] {
            &["test/alpha"]
        }

        fn read(&self, data: &[u8]) -> ProcessorResult<Metadata> {
            let mut payload = Metadata::new();
            if let (Some(text), _) = Self::split(data) {
                payload.insert("text".into(), String::from_utf8_lossy(text).into_owned().into());
            }
            let mut out = Metadata::new();
            out.insert("note".into(), payload.into());
            Ok(out)
        }

        fn strip(&self, data: &[u8]) -> ProcessorResult<Vec<u8>> {
            Ok(Self::split(data).1.to_vec())
        }

        fn combine(&self, data: &[u8], metadata: &Metadata) -> ProcessorResult<Vec<u8>> {
            let payload = require_namespace(metadata, "note")?;
            let text = payload
                .get("text")
                .and_then(MetadataValue::as_text)
                .ok_or_else(|| ProcessorError::validation("note text missing"))?;
            if text.contains('\n') {
                return Err(ProcessorError::unsupported("note text spans lines"));
            }
            let mut out = NOTE_PREFIX.to_vec();
            out.extend_from_slice(text.as_bytes());
            out.push(b'\n');
            out.extend_from_slice(Self::split(data).1);
            Ok(out)
        }
    }

    fn note(text: &str) -> Metadata {
        let mut payload = Metadata::new();
        payload.insert("text".into(), text.into());
        let mut meta = Metadata::new();
        meta.insert("note".into(), payload.into());
        meta
    }

    fn registry() -> ProcessorRegistry {
        let mut r = ProcessorRegistry::default();
        r.register_reader(magic("alpha", b"ALPHA"));
        r.register_reader(magic("beta", b"BETA"));
        r.register_metadata(Box::new(NoteProcessor));
        r
    }

    // -----------------------------------------------------------------------
    // Reader dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn dispatches_to_matching_reader() {
        let r = registry();
        let asset = r.read(b"BETA payload").unwrap();
        assert_eq!(asset.get("reader").and_then(MetadataValue::as_text), Some("beta"));
        assert_eq!(asset.essence().as_bytes(), b" payload");
    }

    #[test]
    fn unknown_input_is_unrecognized() {
        let r = registry();
        let random = b"\x07]>e\x10\n+Y\x07\xd8\xf4\x90%\r\xbbK\xb8+\xf3v%\x0f\x11";
        assert!(matches!(r.read(random), Err(ProcessorError::UnrecognizedFormat)));
        assert!(matches!(
            ProcessorRegistry::default().read(b"anything"),
            Err(ProcessorError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn registration_order_irrelevant_for_exclusive_probes() {
        let mut reversed = ProcessorRegistry::default();
        reversed.register_reader(magic("beta", b"BETA"));
        reversed.register_reader(magic("alpha", b"ALPHA"));

        let forward = registry();
        for input in [&b"ALPHA x"[..], &b"BETA y"[..]] {
            assert_eq!(forward.read(input).unwrap(), reversed.read(input).unwrap());
        }
    }

    #[test]
    fn first_accepting_reader_wins() {
        let mut r = ProcessorRegistry::default();
        r.register_reader(magic("alpha", b"A"));
        r.register_reader(magic("any", b""));
        assert_eq!(r.candidates(b"ALPHA"), vec!["alpha", "any"]);
        assert_eq!(r.probe(b"ALPHA").map(|p| p.name()), Some("alpha"));
        assert_eq!(r.probe(b"zzz").map(|p| p.name()), Some("any"));
    }

    #[test]
    fn priority_overrides_registration_order() {
        let mut r = ProcessorRegistry::default();
        r.register_reader(magic("any", b""));
        r.register_reader_with_priority(magic("alpha", b"A"), 10);
        r.register_reader(magic("beta", b"B"));

        let names: Vec<String> = r.registrations().into_iter().map(|reg| reg.name).collect();
        assert_eq!(names, vec!["alpha", "any", "beta"]);
        assert_eq!(r.probe(b"ALPHA").map(|p| p.name()), Some("alpha"));
    }

    #[test]
    fn extraction_failure_is_surfaced_not_retried() {
        let mut r = ProcessorRegistry::default();
        r.register_reader(Box::new(BrokenProcessor));
        r.register_reader(magic("alpha", b"ALPHA"));
        let err = r.read(b"ALPHA").unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn oversized_input_rejected() {
        let mut r = ProcessorRegistry::new(RegistryConfig {
            max_input_bytes: 4,
            ..Default::default()
        });
        r.register_reader(magic("alpha", b"ALPHA"));
        assert!(matches!(
            r.read(b"ALPHA"),
            Err(ProcessorError::InputTooLarge { limit: 4, actual: 5 })
        ));
        assert!(matches!(
            r.read_from(Cursor::new(b"ALPHA and more".to_vec())),
            Err(ProcessorError::InputTooLarge { limit: 4, .. })
        ));
    }

    #[test]
    fn read_stream_restores_position() {
        let r = registry();

        let mut stream = Cursor::new(b"xxBETA data".to_vec());
        stream.set_position(2);
        let asset = r.read_stream(&mut stream).unwrap();
        assert_eq!(asset.essence().as_bytes(), b" data");
        assert_eq!(stream.position(), 2);

        let mut stream = Cursor::new(b"garbage".to_vec());
        assert!(r.read_stream(&mut stream).is_err());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn supported_mime_types_deduplicated() {
        let mut r = registry();
        r.register_reader(magic("alpha", b"ALPHA2"));
        assert_eq!(r.supported_mime_types(), vec!["test/alpha", "test/beta"]);
    }

    // -----------------------------------------------------------------------
    // Metadata routing
    // -----------------------------------------------------------------------

    #[test]
    fn read_attaches_scoped_metadata() {
        let r = registry();
        let err = r.read(b"#note:hello\nALPHA body").unwrap_err();
        // The note line hides the magic, so no reader accepts it.
        assert!(matches!(err, ProcessorError::UnrecognizedFormat));

        let mut r = ProcessorRegistry::default();
        r.register_reader(magic("alpha", b"#note"));
        r.register_metadata(Box::new(NoteProcessor));
        let asset = r.read(b"#note:hello\nbody").unwrap();
        assert_eq!(asset.get("note"), note("hello").get("note"));
    }

    #[test]
    fn extract_only_skips_metadata() {
        let mut r = ProcessorRegistry::new(RegistryConfig::extract_only());
        r.register_reader(magic("alpha", b"#note"));
        r.register_metadata(Box::new(NoteProcessor));
        let asset = r.read(b"#note:hello\nbody").unwrap();
        assert!(asset.get("note").is_none());
    }

    #[test]
    fn routes_by_namespace() {
        let r = registry();
        assert_eq!(r.metadata_processor("note").unwrap().name(), "note");
        assert!(matches!(
            r.metadata_processor("exif"),
            Err(ProcessorError::UnknownNamespace(ns)) if ns == "exif"
        ));
    }

    #[test]
    fn read_metadata_absent_namespace_is_empty() {
        let r = registry();
        let meta = r.read_metadata(b"ALPHA", "note").unwrap();
        assert!(meta["note"].is_empty_map());
    }

    #[test]
    fn round_trip_through_registry() {
        let r = registry();
        let original = b"#note:written by hand\nALPHA essence".to_vec();

        let meta = r.read_metadata(&original, "note").unwrap();
        let stripped = r.strip_metadata(&original, "note").unwrap();
        assert_eq!(stripped, b"ALPHA essence");
        assert_eq!(r.strip_metadata(&stripped, "note").unwrap(), stripped);

        let combined = r.combine_metadata(&stripped, &meta).unwrap();
        assert_eq!(combined, original);
    }

    #[test]
    fn combine_ignores_plain_attributes() {
        let r = registry();
        let mut meta = note("n");
        meta.insert(MIME_TYPE_KEY.into(), "test/alpha".into());
        assert_eq!(r.combine_metadata(b"ALPHA", &meta).unwrap(), b"#note:n\nALPHA");
    }

    #[test]
    fn combine_rejects_unusable_metadata() {
        let r = registry();
        assert!(matches!(
            r.combine_metadata(b"ALPHA", &Metadata::new()),
            Err(ProcessorError::Validation(_))
        ));

        let mut meta = Metadata::new();
        meta.insert("duration".into(), 1.into());
        assert!(matches!(
            r.combine_metadata(b"ALPHA", &meta),
            Err(ProcessorError::Validation(_))
        ));

        assert!(matches!(
            r.combine_metadata(b"ALPHA", &note("two\nlines")),
            Err(ProcessorError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn failed_combine_leaves_input_untouched() {
        let r = registry();
        let original = b"#note:keep\nALPHA".to_vec();
        let snapshot = original.clone();
        assert!(r.combine_metadata(&original, &note("bad\n")).is_err());
        assert_eq!(original, snapshot);
    }

    #[test]
    fn strip_all_by_mime_type() {
        let r = registry();
        assert_eq!(r.strip_all(b"#note:x\nALPHA", "test/alpha").unwrap(), b"ALPHA");
        assert_eq!(r.strip_all(b"#note:x\nALPHA", "test/beta").unwrap(), b"#note:x\nALPHA");
    }

    #[test]
    fn registrations_report_capabilities() {
        let r = registry();
        let tags: Vec<String> = r
            .registrations()
            .iter()
            .map(|reg| format!("{}={}", reg.name, reg.capability))
            .collect();
        assert_eq!(tags, vec!["alpha=reader", "beta=reader", "note=metadata:note"]);
        assert_eq!(r.reader_count(), 2);
        assert_eq!(r.metadata_count(), 1);
    }
}
