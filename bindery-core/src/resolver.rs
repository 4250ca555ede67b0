use crate::{
    Arg, BeanRef, BindError, Error, FunctionResolver, Holder, HolderType, Input, Output, Result,
    SqlDialect, Token, TokenKind, TriState, Value,
    input::{scalar_value, scalar_values},
};
use anyhow::Context as _;

/// Walks the argument roots to find the source or destination of each bind.
///
/// Roots are tried in order and the first one recognizing the path wins. A path is split on `.`
/// and followed through maps, named values, holders and beans. Tables and bean arrays end the walk
/// on the next segment, taken as the column or property name.
pub struct BindResolver<'a> {
    roots: &'a [Arg],
    functions: Option<&'a dyn FunctionResolver>,
    dialect: &'a dyn SqlDialect,
    check_duplicates: bool,
}

/// Errors of the walk are logged once, when they leave the resolver.
fn fail(error: BindError) -> Error {
    Error::new(error)
}

fn row_container(arg: &Arg) -> bool {
    matches!(
        arg,
        Arg::Table(..) | Arg::TableFilter(..) | Arg::BeanArray(..) | Arg::BeanArrayFilter(..)
    )
}

/// Every element is a bean having `property`, and there is at least one.
fn beans_with(items: &[Arg], property: &str) -> Option<Vec<BeanRef>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| match v {
            Arg::Bean(bean) if bean.0.read().has_property(property) => Some(bean.clone()),
            _ => None,
        })
        .collect()
}

impl<'a> BindResolver<'a> {
    pub fn new(roots: &'a [Arg], dialect: &'a dyn SqlDialect) -> Self {
        Self {
            roots,
            functions: None,
            dialect,
            check_duplicates: false,
        }
    }

    pub fn with_functions(mut self, functions: Option<&'a dyn FunctionResolver>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_check_duplicates(mut self, check: bool) -> Self {
        self.check_duplicates = check;
        self
    }

    pub fn resolve_input(&self, token: &Token) -> Result<Input> {
        match &token.kind {
            TokenKind::FunctionInput { name, args } => self.invoke(token, name, args),
            TokenKind::DialectLiteral { name } => Ok(Input::DialectLiteral {
                text: self.dialect.dialect_literal(name),
            }),
            _ => self
                .resolve_value_input(token)
                .inspect_err(|e| log::error!("{:#}", e)),
        }
    }

    /// Calls the function resolver, the result is bound like the terminal of a path.
    fn invoke(&self, token: &Token, name: &str, args: &[String]) -> Result<Input> {
        let Some(functions) = self.functions else {
            let error = Error::msg(format!(
                "No function resolver available to evaluate {}",
                token.parsed
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let value = functions
            .invoke(name, args, self.roots)
            .with_context(|| format!("While evaluating {}", token.parsed))?;
        Ok(Input::Function {
            name: name.into(),
            value: Box::new(self.input_terminal(token, value, None)?),
        })
    }

    fn resolve_value_input(&self, token: &Token) -> Result<Input> {
        let path = token.name().split('.').collect::<Vec<_>>();
        let mut found = None;
        for root in self.roots {
            let Some(input) = self.input_rec(token, root, &path, None)? else {
                continue;
            };
            if found.is_some() {
                log::warn!("Multiple matches for bind `{}`", token.parsed);
                continue;
            }
            found = Some(input);
            if !self.check_duplicates {
                break;
            }
        }
        found.ok_or_else(|| {
            fail(BindError::UnresolvedInput {
                token: token.parsed.clone(),
            })
        })
    }

    pub fn resolve_output(&self, token: &Token) -> Result<Output> {
        self.resolve_value_output(token)
            .inspect_err(|e| log::error!("{:#}", e))
    }

    fn resolve_value_output(&self, token: &Token) -> Result<Output> {
        let path = token.name().split('.').collect::<Vec<_>>();
        let mut found = None;
        for root in self.roots {
            let Some(output) = self.output_rec(token, root, &path)? else {
                continue;
            };
            if found.is_some() {
                log::warn!("Multiple matches for bind `{}`", token.parsed);
                continue;
            }
            found = Some(output);
            if !self.check_duplicates {
                break;
            }
        }
        found.ok_or_else(|| {
            fail(BindError::UnresolvedOutput {
                token: token.parsed.clone(),
            })
        })
    }

    fn input_rec(
        &self,
        token: &Token,
        root: &Arg,
        path: &[&str],
        null_type: Option<&Value>,
    ) -> Result<Option<Input>> {
        let Some(&name) = path.first() else {
            return Ok(None);
        };
        let terminal = path.len() == 1;
        let (value, null_type) = match root {
            Arg::Map(map) => match map.get(name) {
                Some(value) => (value, None),
                None => return Ok(None),
            },
            Arg::Pair(pair) if pair.name == name => (pair.value.clone(), pair.null_type.clone()),
            Arg::Holder(holder) if name == "value" => {
                (Arg::Holder(holder.clone()), null_type.cloned())
            }
            Arg::Table(table) => {
                return Ok(table.has_column(name).then(|| Input::Table {
                    table: table.clone(),
                    rows: None,
                    column: name.into(),
                }));
            }
            Arg::TableFilter(filter) => {
                return Ok(filter.table.has_column(name).then(|| Input::Table {
                    table: filter.table.clone(),
                    rows: Some(filter.rows.clone()),
                    column: name.into(),
                }));
            }
            Arg::BeanArray(array) => {
                return Ok(array.0.read().has_property(name).then(|| Input::BeanArray {
                    array: array.clone(),
                    indices: None,
                    property: name.into(),
                }));
            }
            Arg::BeanArrayFilter(filter) => {
                return Ok(filter.array.0.read().has_property(name).then(|| {
                    Input::BeanArray {
                        array: filter.array.clone(),
                        indices: Some(filter.indices.clone()),
                        property: name.into(),
                    }
                }));
            }
            Arg::Array(items) | Arg::Collection(items) if terminal => {
                return Ok(beans_with(items, name).map(|beans| Input::BeanProperty {
                    beans,
                    property: name.into(),
                }));
            }
            Arg::Bean(bean) => match bean.0.read().property(name) {
                Some(value) => (value, None),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        if row_container(&value) && !terminal {
            return self.input_rec(token, &value, &path[1..], None);
        }
        if terminal {
            return self.input_terminal(token, value, null_type.as_ref()).map(Some);
        }
        if value.is_null() {
            return Err(fail(BindError::NullOnPath {
                token: token.parsed.clone(),
                element: name.into(),
            }));
        }
        self.input_descend(token, value, &path[1..])
    }

    /// Holders are dereferenced first (`:holder.prop`), then addressed themselves
    /// (`:holder.value.prop`).
    fn input_descend(&self, token: &Token, value: Arg, path: &[&str]) -> Result<Option<Input>> {
        if let Arg::Holder(holder) = &value {
            match self.input_rec(token, &holder.get(), path, None) {
                Ok(Some(input)) => return Ok(Some(input)),
                Ok(None) => {}
                Err(e) => log::trace!(
                    "Retrying `{}` on the holder itself: {:#}",
                    token.parsed,
                    e
                ),
            }
        }
        self.input_rec(token, &value, path, None)
    }

    fn input_terminal(
        &self,
        token: &Token,
        value: Arg,
        null_type: Option<&Value>,
    ) -> Result<Input> {
        match value {
            Arg::Value(v) if v.is_null() => Ok(Input::Single {
                value: match (v, null_type) {
                    (Value::Null, Some(t)) => t.as_null(),
                    (v, _) => v,
                },
            }),
            Arg::Value(Value::Array(values, element)) => Ok(Input::Array {
                values: values.map(|v| v.into_vec()).unwrap_or_default(),
                element: *element,
            }),
            Arg::Value(value) => Ok(Input::Single { value }),
            Arg::TriState(v) => Ok(Input::TriState(v)),
            Arg::Array(items) | Arg::Collection(items) => {
                let values = scalar_values(token, items)?;
                let element = values
                    .iter()
                    .find(|v| !v.is_null())
                    .map(Value::as_null)
                    .unwrap_or_default();
                Ok(Input::Array { values, element })
            }
            Arg::Holder(holder) => self.holder_input(token, &holder),
            _ => Err(fail(BindError::NotTerminal {
                token: token.parsed.clone(),
            })),
        }
    }

    fn holder_input(&self, token: &Token, holder: &Holder) -> Result<Input> {
        match holder.holder_type() {
            HolderType::Array(element) | HolderType::List(element) | HolderType::Set(element) => {
                let values = match holder.get() {
                    Arg::Array(items) | Arg::Collection(items) => scalar_values(token, items)?,
                    _ => holder.values()?,
                };
                Ok(Input::Array {
                    values,
                    element: element.clone(),
                })
            }
            HolderType::TriState => Ok(Input::TriState(match holder.get() {
                Arg::TriState(v) => v,
                v => TriState::from_value(&scalar_value(token, v, 0)?)?,
            })),
            HolderType::Scalar(prototype) => {
                let value = holder.value();
                Ok(Input::Single {
                    value: if value.is_null() {
                        prototype.as_null()
                    } else {
                        value
                    },
                })
            }
            HolderType::Any => match holder.get() {
                Arg::Holder(..) => Err(fail(BindError::NotTerminal {
                    token: token.parsed.clone(),
                })),
                v => self.input_terminal(token, v, None),
            },
        }
    }

    fn output_rec(&self, token: &Token, root: &Arg, path: &[&str]) -> Result<Option<Output>> {
        let Some(&name) = path.first() else {
            return Ok(None);
        };
        let terminal = path.len() == 1;
        match root {
            Arg::Map(map) => {
                let Some(value) = map.get(name) else {
                    return Ok(None);
                };
                if row_container(&value) {
                    return self.output_row_container(token, value, path);
                }
                if terminal {
                    return Ok(Some(match value {
                        Arg::Holder(holder) => holder_output(holder),
                        _ => Output::Map {
                            map: map.clone(),
                            key: name.into(),
                        },
                    }));
                }
                self.output_descend(token, name, value, &path[1..])
            }
            Arg::Pair(pair) if pair.name == name => {
                let value = pair.value.clone();
                if row_container(&value) {
                    return self.output_row_container(token, value, path);
                }
                if terminal {
                    return match value {
                        Arg::Holder(holder) => Ok(Some(holder_output(holder))),
                        v if v.is_null() => Err(fail(BindError::NullOnPath {
                            token: token.parsed.clone(),
                            element: name.into(),
                        })),
                        _ => Err(fail(BindError::InvalidContainer {
                            token: token.parsed.clone(),
                        })),
                    };
                }
                self.output_descend(token, name, value, &path[1..])
            }
            Arg::Holder(holder) if name == "value" => {
                if terminal {
                    return Ok(Some(holder_output(holder.clone())));
                }
                self.output_descend(token, name, holder.get(), &path[1..])
            }
            Arg::Table(table) => Ok(table.has_column(name).then(|| Output::Table {
                table: table.clone(),
                rows: None,
                column: name.into(),
            })),
            Arg::TableFilter(filter) => Ok(filter.table.has_column(name).then(|| Output::Table {
                table: filter.table.clone(),
                rows: Some(filter.rows.clone()),
                column: name.into(),
            })),
            Arg::BeanArray(array) => {
                Ok(array.0.read().has_property(name).then(|| Output::BeanArray {
                    array: array.clone(),
                    indices: None,
                    property: name.into(),
                }))
            }
            Arg::BeanArrayFilter(filter) => Ok(filter.array.0.read().has_property(name).then(
                || Output::BeanArray {
                    array: filter.array.clone(),
                    indices: Some(filter.indices.clone()),
                    property: name.into(),
                },
            )),
            Arg::Array(items) | Arg::Collection(items) if terminal => Ok(beans_with(items, name)
                .map(|beans| Output::BeanProperty {
                    beans,
                    property: name.into(),
                })),
            Arg::Bean(bean) => {
                let (writable, value) = {
                    let bean = bean.0.read();
                    if !bean.has_property(name) {
                        return Ok(None);
                    }
                    (bean.is_writable(name), bean.property(name))
                };
                let value = value.unwrap_or_else(Arg::null);
                if row_container(&value) && !terminal {
                    return self.output_row_container(token, value, path);
                }
                if terminal {
                    if writable {
                        return Ok(Some(Output::BeanProperty {
                            beans: vec![bean.clone()],
                            property: name.into(),
                        }));
                    }
                    return match value {
                        v if row_container(&v) => Err(fail(BindError::ContainerAsTerminal {
                            token: token.parsed.clone(),
                            shape: v.shape(),
                        })),
                        Arg::Holder(holder) => Ok(Some(holder_output(holder))),
                        _ => Ok(None),
                    };
                }
                self.output_descend(token, name, value, &path[1..])
            }
            _ => Ok(None),
        }
    }

    /// A table or bean array found on the path, addressed by the next segment.
    fn output_row_container(
        &self,
        token: &Token,
        value: Arg,
        path: &[&str],
    ) -> Result<Option<Output>> {
        if path.len() < 2 {
            return Err(fail(BindError::ContainerAsTerminal {
                token: token.parsed.clone(),
                shape: value.shape(),
            }));
        }
        self.output_rec(token, &value, &path[1..])
    }

    fn output_descend(
        &self,
        token: &Token,
        name: &str,
        value: Arg,
        path: &[&str],
    ) -> Result<Option<Output>> {
        if value.is_null() {
            return Err(fail(BindError::NullOnPath {
                token: token.parsed.clone(),
                element: name.into(),
            }));
        }
        if let Arg::Holder(holder) = &value {
            match self.output_rec(token, &holder.get(), path) {
                Ok(Some(output)) => return Ok(Some(output)),
                Ok(None) => {}
                Err(e) => log::trace!(
                    "Retrying `{}` on the holder itself: {:#}",
                    token.parsed,
                    e
                ),
            }
        }
        self.output_rec(token, &value, path)
    }
}

fn holder_output(holder: Holder) -> Output {
    match holder.holder_type() {
        HolderType::Array(..) | HolderType::List(..) | HolderType::Set(..) => {
            Output::ArrayHolder { holder }
        }
        _ => Output::SingleHolder { holder },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnsiDialect, ArgMap, NamedValue, OracleDialect, TableHolder, TemplateBuilder};

    fn input(path: &str) -> Token {
        (*TemplateBuilder::new().input(path).build().tokens[0]).clone()
    }

    fn output(path: &str) -> Token {
        (*TemplateBuilder::new().output(path).build().tokens[0]).clone()
    }

    struct ErrorLog(parking_lot::Mutex<Vec<String>>);

    impl log::Log for ErrorLog {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            if record.level() == log::Level::Error {
                self.0.lock().push(record.args().to_string());
            }
        }
        fn flush(&self) {}
    }

    static ERRORS: ErrorLog = ErrorLog(parking_lot::const_mutex(Vec::new()));

    fn logged_errors(marker: &str) -> Vec<String> {
        ERRORS
            .0
            .lock()
            .iter()
            .filter(|v| v.contains(marker))
            .cloned()
            .collect()
    }

    #[test]
    fn holder_retry_is_quiet() {
        let _ = log::set_logger(&ERRORS);
        log::set_max_level(log::LevelFilter::Trace);
        let holder = Holder::any(ArgMap::new().with("value", Arg::null()));
        let roots = [Arg::from(ArgMap::new().with("box", holder))];
        let resolver = BindResolver::new(&roots, &AnsiDialect);

        // The content fails on null, the holder itself resolves
        let resolved = resolver.resolve_input(&input("box.value.value")).unwrap();
        assert!(matches!(resolved, Input::Single { value } if value.is_null()));
        assert!(logged_errors("box.value.value").is_empty());

        // A real failure is logged once
        resolver
            .resolve_input(&input("box.value.missing"))
            .expect_err("Nothing named missing");
        assert_eq!(logged_errors("box.value.missing").len(), 1);
    }

    #[test]
    fn first_root_wins() {
        let roots = [Arg::from(ArgMap::new().with("id", 1)), Arg::pair("id", 2)];
        let resolver = BindResolver::new(&roots, &AnsiDialect).with_check_duplicates(true);
        let resolved = resolver.resolve_input(&input("id")).unwrap();
        assert!(matches!(
            resolved,
            Input::Single {
                value: Value::Int32(Some(1))
            }
        ));
    }

    #[test]
    fn unresolved_and_null_on_path() {
        let roots = [Arg::from(ArgMap::new().with("person", Arg::null()))];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        let error = resolver.resolve_input(&input("missing")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::UnresolvedInput { .. })
        ));
        let error = resolver.resolve_input(&input("person.name")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::NullOnPath { .. })
        ));
    }

    #[test]
    fn holder_both_forms() {
        let inner = ArgMap::new().with("name", "alpha");
        let roots = [Arg::pair("h", Holder::any(inner))];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        for path in ["h.name", "h.value.name"] {
            let resolved = resolver.resolve_input(&input(path)).unwrap();
            assert!(
                matches!(&resolved, Input::Single { value } if *value == Value::from("alpha")),
                "{path}"
            );
        }
    }

    #[test]
    fn holder_types() {
        let roots = [
            Arg::pair("ids", Holder::list([3, 7, 9])),
            Arg::pair("empty", Holder::empty::<i64>()),
            Arg::from(NamedValue::new("typed", Arg::null()).with_null_type(Value::Date(None))),
        ];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        assert!(matches!(
            resolver.resolve_input(&input("ids")).unwrap(),
            Input::Array { values, .. } if values.len() == 3
        ));
        assert!(matches!(
            resolver.resolve_input(&input("empty")).unwrap(),
            Input::Single {
                value: Value::Int64(None)
            }
        ));
        assert!(matches!(
            resolver.resolve_input(&input("typed")).unwrap(),
            Input::Single {
                value: Value::Date(None)
            }
        ));
    }

    #[test]
    fn collections_must_hold_scalars() {
        let roots = [
            Arg::pair("ids", Arg::collection([1, 2])),
            Arg::pair("mixed", Arg::Collection(vec![1.into(), ArgMap::new().into()])),
        ];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        assert!(matches!(
            resolver.resolve_input(&input("ids")).unwrap(),
            Input::Array {
                element: Value::Int32(None),
                ..
            }
        ));
        let error = resolver.resolve_input(&input("mixed")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::NotScalar { index: 1, .. })
        ));
    }

    #[test]
    fn table_ends_the_walk() {
        let table = TableHolder::new([("id", Value::Int32(None))])
            .with_row([1.into()])
            .unwrap();
        let roots = [Arg::from(ArgMap::new().with("rows", table))];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        assert!(matches!(
            resolver.resolve_input(&input("rows.id")).unwrap(),
            Input::Table { column, .. } if column == "id"
        ));
        assert!(resolver.resolve_input(&input("rows.missing")).is_err());
        assert!(matches!(
            resolver.resolve_output(&output("rows.id")).unwrap(),
            Output::Table { .. }
        ));
        let error = resolver.resolve_output(&output("rows")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::ContainerAsTerminal { .. })
        ));
    }

    #[test]
    fn outputs() {
        let roots = [
            Arg::from(ArgMap::new().with("count", Arg::null())),
            Arg::pair("name", Holder::empty::<String>()),
            Arg::pair("plain", 5),
        ];
        let resolver = BindResolver::new(&roots, &AnsiDialect);
        assert!(matches!(
            resolver.resolve_output(&output("count")).unwrap(),
            Output::Map { .. }
        ));
        assert!(matches!(
            resolver.resolve_output(&output("name")).unwrap(),
            Output::SingleHolder { .. }
        ));
        let error = resolver.resolve_output(&output("plain")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::InvalidContainer { .. })
        ));
        let error = resolver.resolve_output(&output("other")).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<BindError>(),
            Some(BindError::UnresolvedOutput { .. })
        ));
    }

    #[test]
    fn functions_and_literals() {
        let roots = [Arg::pair("base", 40)];
        let functions = |name: &str, args: &[String], roots: &[Arg]| -> Result<Arg> {
            assert_eq!(name, "offset");
            assert_eq!(args, ["2"]);
            assert_eq!(roots.len(), 1);
            Ok(Arg::from(42))
        };
        let resolver = BindResolver::new(&roots, &OracleDialect).with_functions(Some(&functions));
        let statement = TemplateBuilder::new()
            .function("offset", &["2"])
            .dialect_literal("sysdate")
            .build();
        assert!(matches!(
            resolver.resolve_input(&statement.tokens[0]).unwrap(),
            Input::Function { value, .. } if matches!(*value, Input::Single { value: Value::Int32(Some(42)) })
        ));
        assert!(matches!(
            resolver.resolve_input(&statement.tokens[1]).unwrap(),
            Input::DialectLiteral { text } if text == "SYSDATE"
        ));
        let resolver = BindResolver::new(&roots, &OracleDialect);
        assert!(resolver.resolve_input(&statement.tokens[0]).is_err());
    }
}
