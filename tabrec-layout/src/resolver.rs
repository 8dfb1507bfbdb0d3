use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use tabrec_dict::{DictionaryProvider, DictionaryRef};
use tabrec_dtype::{ColumnRef, TableDesc};
use tabrec_error::{TabrecResult, tabrec_bail, tabrec_err};

use crate::{
    FixedLenCodecRef, LocalDictionaryPolicy, RecordLayoutDigest, RecordView, ResolverOptions,
    SegmentRef,
};

/// Binds a table to the dictionaries and codecs of its columns and derives the record layout.
///
/// The resolver builds exactly one [`RecordLayoutDigest`] and keeps it for its whole life.
/// Unlike the digest, it holds on to the dictionaries, which makes it the entry point for
/// string-level access to dimension columns.
#[derive(Debug)]
pub struct RecordLayoutResolver {
    segment: Option<SegmentRef>,
    desc: Arc<TableDesc>,
    dictionaries: Vec<Option<DictionaryRef>>,
    digest: RecordLayoutDigest,
    local_dictionaries: Arc<dyn LocalDictionaryPolicy>,
}

impl RecordLayoutResolver {
    /// Bind the columns of `segment`, loading every dimension column's dictionary from the path
    /// the segment reports for it.
    pub fn try_from_segment(
        segment: SegmentRef,
        provider: &dyn DictionaryProvider,
        options: &ResolverOptions,
    ) -> TabrecResult<Self> {
        let desc = segment.desc().clone();
        let dictionaries = desc
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                if desc.is_metric(idx) {
                    return Ok(None);
                }
                let path = segment.dictionary_path(column).ok_or_else(|| {
                    tabrec_err!(NotFound: "segment {} has no dictionary for column {column}", segment.id())
                })?;
                let dictionary = provider
                    .dictionary(&path)
                    .map_err(|err| err.with_context(format!("loading dictionary {path} for column {column}")))?
                    .ok_or_else(|| tabrec_err!(NotFound: "dictionary {path} does not exist"))?;
                log::trace!(
                    "Bound column {column} of segment {} to dictionary {path} (max id {})",
                    segment.id(),
                    dictionary.max_id()
                );
                Ok(Some(dictionary))
            })
            .collect::<TabrecResult<Vec<_>>>()?;

        Self::try_new(Some(segment), desc, dictionaries, options)
    }

    /// Bind the columns of `desc` to explicitly supplied dictionaries.
    ///
    /// Every dimension column must have an entry in `dictionaries`; entries for other columns
    /// are ignored.
    pub fn try_with_dictionaries(
        desc: Arc<TableDesc>,
        dictionaries: &HashMap<ColumnRef, DictionaryRef>,
        options: &ResolverOptions,
    ) -> TabrecResult<Self> {
        let bound = desc
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                if desc.is_metric(idx) {
                    return Ok(None);
                }
                dictionaries
                    .get(column)
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| tabrec_err!(NotFound: "dictionary for column {column} does not exist"))
            })
            .collect::<TabrecResult<Vec<_>>>()?;

        Self::try_new(None, desc, bound, options)
    }

    fn try_new(
        segment: Option<SegmentRef>,
        desc: Arc<TableDesc>,
        dictionaries: Vec<Option<DictionaryRef>>,
        options: &ResolverOptions,
    ) -> TabrecResult<Self> {
        let codecs = desc
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                if !desc.is_metric(idx) {
                    return Ok(None);
                }
                options
                    .codecs()
                    .codec(column.dtype())
                    .map(Some)
                    .map_err(|err| err.with_context(format!("resolving codec of metric column {column}")))
            })
            .collect::<TabrecResult<Vec<Option<FixedLenCodecRef>>>>()?;

        let digest = RecordLayoutDigest::try_new(desc.metric_flags(), &codecs, &dictionaries)?;

        Ok(Self {
            segment,
            desc,
            dictionaries,
            digest,
            local_dictionaries: options.local_dictionary_policy().clone(),
        })
    }

    pub fn digest(&self) -> &RecordLayoutDigest {
        &self.digest
    }

    pub fn desc(&self) -> &Arc<TableDesc> {
        &self.desc
    }

    /// The columns in layout order.
    pub fn columns(&self) -> &[ColumnRef] {
        self.desc.columns()
    }

    /// The segment this resolver was built from, if any.
    pub fn segment(&self) -> Option<&SegmentRef> {
        self.segment.as_ref()
    }

    pub fn timestamp_column(&self) -> Option<usize> {
        self.desc.timestamp_column()
    }

    /// The index of `column`, or `None` if it is not part of the table.
    pub fn find_column(&self, column: &ColumnRef) -> Option<usize> {
        self.desc.find_column(column)
    }

    /// The index of the fact table's column called `name`, ignoring ASCII case.
    pub fn find_fact_table_column(&self, name: &str) -> Option<usize> {
        let fact_table = self.desc.fact_table();
        self.columns()
            .iter()
            .position(|column| column.is_same_as(fact_table, name))
    }

    /// The dictionary currently bound to dimension column `idx`.
    pub fn dictionary(&self, idx: usize) -> TabrecResult<&DictionaryRef> {
        let ncols = self.dictionaries.len();
        self.dictionaries
            .get(idx)
            .ok_or_else(|| tabrec_err!(OutOfBounds: idx, 0, ncols))?
            .as_ref()
            .ok_or_else(|| tabrec_err!("column {idx} is a metric column and has no dictionary"))
    }

    /// Rebind `columns[i]` to `dictionaries[i]` for every `i`.
    ///
    /// Either every binding is replaced or, on error, none is. The record layout is not
    /// rebuilt: a replacement must fit the slot width the layout reserved for its column.
    pub fn update_dictionaries(
        &mut self,
        dictionaries: Vec<DictionaryRef>,
        columns: &[usize],
    ) -> TabrecResult<()> {
        if dictionaries.len() != columns.len() {
            tabrec_bail!(
                "{} replacement dictionaries for {} columns",
                dictionaries.len(),
                columns.len()
            );
        }

        for (dictionary, &idx) in dictionaries.iter().zip(columns) {
            let capacity = self.digest.id_capacity(idx)?;
            let max_id = dictionary.max_id();
            if max_id > capacity {
                tabrec_bail!(
                    "dictionary with max id {max_id} does not fit the {}-byte slot of column {}",
                    self.digest.length(idx),
                    self.desc.columns()[idx]
                );
            }
            if max_id > self.digest.dict_max_id(idx) {
                log::warn!(
                    "Dictionary of column {} grew from max id {} to {max_id} since the record layout was built",
                    self.desc.columns()[idx],
                    self.digest.dict_max_id(idx)
                );
            }
        }

        for (dictionary, idx) in dictionaries.into_iter().zip_eq(columns) {
            self.dictionaries[*idx] = Some(dictionary);
        }
        Ok(())
    }

    /// Rebind the columns selected by the configured [`LocalDictionaryPolicy`], in the order
    /// the policy lists them.
    pub fn update_local_dictionaries(&mut self, dictionaries: Vec<DictionaryRef>) -> TabrecResult<()> {
        let columns = self.local_dictionaries.local_dictionary_columns(&self.desc);
        self.update_dictionaries(dictionaries, &columns)
    }

    /// A zeroed record of this table's layout.
    pub fn create_record(&self) -> RecordView {
        self.digest.allocate()
    }

    /// The string stored in dimension column `idx` of `record`, or `None` if its ID is not
    /// assigned in the bound dictionary.
    pub fn value_string<'a>(&'a self, record: &RecordView, idx: usize) -> TabrecResult<Option<&'a str>> {
        self.check_record(record)?;
        let dictionary = self.dictionary(idx)?;
        let id = record.dictionary_id(idx)?;
        Ok(dictionary.value_of(id))
    }

    /// Store the ID of `value` in dimension column `idx` of `record`.
    pub fn set_value_string(&self, record: &mut RecordView, idx: usize, value: &str) -> TabrecResult<()> {
        self.check_record(record)?;
        let dictionary = self.dictionary(idx)?;
        let id = dictionary.id_of(value).ok_or_else(|| {
            tabrec_err!(NotFound: "value {value} is not in the dictionary of column {}", self.desc.columns()[idx])
        })?;
        record.set_dictionary_id(idx, id)
    }

    fn check_record(&self, record: &RecordView) -> TabrecResult<()> {
        if record.digest() != &self.digest {
            tabrec_bail!("record was not created with the layout of table {}", self.desc.fact_table());
        }
        Ok(())
    }
}

impl PartialEq for RecordLayoutResolver {
    fn eq(&self, other: &Self) -> bool {
        match (&self.segment, &other.segment) {
            (Some(a), Some(b)) => a.id() == b.id(),
            (None, None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rstest::{fixture, rstest};
    use tabrec_dict::test_harness::StringDictionary;
    use tabrec_dict::{Dictionary, DictionaryRef};
    use tabrec_dtype::{ColumnRef, DType, PType, PValue, TableDesc};
    use tabrec_error::TabrecError;

    use crate::{LocalDictionaryPolicy, RecordLayoutResolver, ResolverOptions};

    fn column(name: &str, dtype: DType) -> ColumnRef {
        ColumnRef::new("SALES", name, dtype)
    }

    /// `[dimension A, metric B (i32), dimension C]`
    #[fixture]
    fn desc() -> Arc<TableDesc> {
        Arc::new(
            TableDesc::try_new(
                "SALES",
                [
                    (column("A", DType::Utf8), false),
                    (column("B", DType::Primitive(PType::I32)), true),
                    (column("C", DType::Utf8), false),
                ],
            )
            .unwrap(),
        )
    }

    fn bindings(a: DictionaryRef, c: DictionaryRef) -> HashMap<ColumnRef, DictionaryRef> {
        HashMap::from([
            (column("A", DType::Utf8), a),
            (column("C", DType::Utf8), c),
        ])
    }

    #[fixture]
    fn resolver(desc: Arc<TableDesc>) -> RecordLayoutResolver {
        let dictionaries = bindings(
            StringDictionary::with_max_id(300).into_ref(),
            StringDictionary::from_values(["CN", "DE", "FR", "JP", "UK", "US"]).into_ref(),
        );
        RecordLayoutResolver::try_with_dictionaries(desc, &dictionaries, &ResolverOptions::default())
            .unwrap()
    }

    #[rstest]
    fn builds_layout(resolver: RecordLayoutResolver) {
        let digest = resolver.digest();
        assert_eq!(digest.lengths(), &[2, 4, 1]);
        assert_eq!(digest.offsets(), &[0, 2, 6]);
        assert_eq!(digest.byte_width(), 7);
        assert_eq!(resolver.columns().len(), 3);
        assert!(resolver.segment().is_none());
        assert_eq!(resolver.create_record().as_slice().len(), 7);
    }

    #[rstest]
    fn digest_is_built_once(resolver: RecordLayoutResolver) {
        let first = resolver.digest().clone();
        let _ = resolver.create_record();
        assert!(std::ptr::eq(
            first.offsets().as_ptr(),
            resolver.digest().offsets().as_ptr()
        ));
    }

    #[rstest]
    fn missing_dictionary_is_fatal(desc: Arc<TableDesc>) {
        let dictionaries = HashMap::from([(
            column("A", DType::Utf8),
            StringDictionary::with_max_id(3).into_ref(),
        )]);
        let err = RecordLayoutResolver::try_with_dictionaries(
            desc,
            &dictionaries,
            &ResolverOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TabrecError::NotFound(..)));
        assert!(err.to_string().contains("SALES.C"));
    }

    #[rstest]
    fn missing_codec_is_fatal(desc: Arc<TableDesc>) {
        let options =
            ResolverOptions::default().with_codecs(Arc::new(crate::CodecRegistry::empty()));
        let dictionaries = bindings(
            StringDictionary::with_max_id(3).into_ref(),
            StringDictionary::with_max_id(3).into_ref(),
        );
        assert!(RecordLayoutResolver::try_with_dictionaries(desc, &dictionaries, &options).is_err());
    }

    #[rstest]
    fn finds_columns(resolver: RecordLayoutResolver) {
        assert_eq!(resolver.find_column(&column("C", DType::Utf8)), Some(2));
        assert_eq!(resolver.find_column(&column("Z", DType::Utf8)), None);
        assert_eq!(
            resolver.find_column(&ColumnRef::new("OTHER", "A", DType::Utf8)),
            None
        );
        assert_eq!(resolver.find_fact_table_column("b"), Some(1));
        assert_eq!(resolver.find_fact_table_column("B"), Some(1));
        assert_eq!(resolver.find_fact_table_column("missing"), None);
    }

    #[rstest]
    fn dictionary_access(resolver: RecordLayoutResolver) {
        assert_eq!(resolver.dictionary(0).unwrap().max_id(), 300);
        assert!(matches!(
            resolver.dictionary(1).unwrap_err(),
            TabrecError::InvalidArgument(..)
        ));
        assert!(matches!(
            resolver.dictionary(3).unwrap_err(),
            TabrecError::OutOfBounds(3, 0, 3, _)
        ));
    }

    #[rstest]
    fn string_values(resolver: RecordLayoutResolver) {
        let mut record = resolver.create_record();
        resolver.set_value_string(&mut record, 0, "v250").unwrap();
        resolver.set_value_string(&mut record, 2, "JP").unwrap();
        record.set_metric_value(1, 99i32).unwrap();

        assert_eq!(record.dictionary_id(0).unwrap(), 250);
        assert_eq!(record.dictionary_id(2).unwrap(), 3);
        assert_eq!(resolver.value_string(&record, 0).unwrap(), Some("v250"));
        assert_eq!(resolver.value_string(&record, 2).unwrap(), Some("JP"));
        assert_eq!(record.metric_value(1).unwrap(), PValue::I32(99));

        let err = resolver
            .set_value_string(&mut record, 2, "BR")
            .unwrap_err();
        assert!(matches!(err, TabrecError::NotFound(..)));
        assert!(resolver.value_string(&record, 1).is_err());

        record.set_dictionary_id(2, 200).unwrap();
        assert_eq!(resolver.value_string(&record, 2).unwrap(), None);
    }

    #[rstest]
    fn rejects_foreign_records(resolver: RecordLayoutResolver, desc: Arc<TableDesc>) {
        let other = RecordLayoutResolver::try_with_dictionaries(
            desc,
            &bindings(
                StringDictionary::with_max_id(70_000).into_ref(),
                StringDictionary::with_max_id(5).into_ref(),
            ),
            &ResolverOptions::default(),
        )
        .unwrap();
        let record = other.create_record();
        assert!(resolver.value_string(&record, 0).is_err());
    }

    #[rstest]
    fn update_count_mismatch_leaves_bindings(mut resolver: RecordLayoutResolver) {
        let before = (0..3)
            .map(|idx| resolver.dictionary(idx).ok().cloned())
            .collect::<Vec<_>>();

        let err = resolver
            .update_dictionaries(
                vec![
                    StringDictionary::with_max_id(1).into_ref(),
                    StringDictionary::with_max_id(2).into_ref(),
                ],
                &[0, 1, 2],
            )
            .unwrap_err();
        assert!(matches!(err, TabrecError::InvalidArgument(..)));

        for (idx, previous) in before.iter().enumerate() {
            match (previous, resolver.dictionary(idx).ok()) {
                (Some(a), Some(b)) => assert!(Arc::ptr_eq(a, b)),
                (None, None) => {}
                _ => panic!("binding of column {idx} changed"),
            }
        }
    }

    #[rstest]
    fn update_rebinds_without_rebuilding(mut resolver: RecordLayoutResolver) {
        let digest = resolver.digest().clone();
        let replacement = StringDictionary::from_values(["a", "b"]).into_ref();
        resolver
            .update_dictionaries(vec![replacement.clone()], &[2])
            .unwrap();
        assert!(Arc::ptr_eq(resolver.dictionary(2).unwrap(), &replacement));
        assert_eq!(resolver.digest(), &digest);

        // Grows past the frozen max id but still fits two bytes.
        resolver
            .update_dictionaries(vec![StringDictionary::with_max_id(1_000).into_ref()], &[0])
            .unwrap();
        assert_eq!(resolver.dictionary(0).unwrap().max_id(), 1_000);
        assert_eq!(resolver.digest().dict_max_id(0), 300);
    }

    #[rstest]
    #[case::metric_column(1, 3)]
    #[case::out_of_bounds(5, 3)]
    #[case::beyond_slot(2, 256)]
    fn update_rejects(mut resolver: RecordLayoutResolver, #[case] idx: usize, #[case] max_id: u32) {
        let replacement = StringDictionary::with_max_id(max_id).into_ref();
        let kept = resolver.dictionary(0).unwrap().clone();
        // The first rebinding is valid; it must not be applied when the second fails.
        assert!(
            resolver
                .update_dictionaries(
                    vec![StringDictionary::with_max_id(1).into_ref(), replacement],
                    &[0, idx]
                )
                .is_err()
        );
        assert!(Arc::ptr_eq(resolver.dictionary(0).unwrap(), &kept));
    }

    #[derive(Debug)]
    struct LastColumn;

    impl LocalDictionaryPolicy for LastColumn {
        fn local_dictionary_columns(&self, desc: &TableDesc) -> Vec<usize> {
            vec![desc.len() - 1]
        }
    }

    #[rstest]
    fn local_dictionaries(mut resolver: RecordLayoutResolver, desc: Arc<TableDesc>) {
        resolver.update_local_dictionaries(Vec::new()).unwrap();
        assert!(
            resolver
                .update_local_dictionaries(vec![StringDictionary::with_max_id(1).into_ref()])
                .is_err()
        );

        let options = ResolverOptions::default().with_local_dictionary_policy(Arc::new(LastColumn));
        let mut local = RecordLayoutResolver::try_with_dictionaries(
            desc,
            &bindings(
                StringDictionary::with_max_id(300).into_ref(),
                StringDictionary::with_max_id(5).into_ref(),
            ),
            &options,
        )
        .unwrap();
        let replacement = StringDictionary::with_max_id(9).into_ref();
        local
            .update_local_dictionaries(vec![replacement.clone()])
            .unwrap();
        assert!(Arc::ptr_eq(local.dictionary(2).unwrap(), &replacement));
    }

    #[rstest]
    fn unbound_resolvers_are_equal(resolver: RecordLayoutResolver, desc: Arc<TableDesc>) {
        let other = RecordLayoutResolver::try_with_dictionaries(
            desc,
            &bindings(
                StringDictionary::with_max_id(1).into_ref(),
                StringDictionary::with_max_id(1).into_ref(),
            ),
            &ResolverOptions::default(),
        )
        .unwrap();
        assert_eq!(resolver, other);
    }
}
