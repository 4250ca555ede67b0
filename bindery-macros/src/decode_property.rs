use convert_case::{Case, Casing};
use syn::{Field, Ident, ItemStruct, LitStr, Type};

pub(crate) struct PropertyMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    pub(crate) name: String,
    pub(crate) read_only: bool,
}

/// Case applied to the field names, from `#[property_case("camel")]` on the struct.
pub(crate) fn property_case(item: &ItemStruct) -> Option<Case> {
    item.attrs.iter().find_map(|attr| {
        if !attr.meta.path().is_ident("property_case") {
            return None;
        }
        let case = attr
            .meta
            .require_list()
            .and_then(|v| v.parse_args::<LitStr>())
            .map(|v| v.value());
        Some(match case.as_deref() {
            Ok("camel") => Case::Camel,
            Ok("pascal") => Case::Pascal,
            Ok("snake") => Case::Snake,
            _ => panic!(
                "Error while parsing `property_case`, use it like #[property_case(\"camel\")] (camel, pascal or snake)"
            ),
        })
    })
}

/// `None` for fields marked `#[property_skip]`.
pub(crate) fn decode_property(field: &Field, case: Option<&Case>) -> Option<PropertyMetadata> {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut name = ident.to_string();
    if let Some(case) = case {
        name = name.to_case(case.clone());
    }
    let mut read_only = false;
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("property_skip") {
            return None;
        } else if meta.path().is_ident("property_read_only") {
            read_only = true;
        } else if meta.path().is_ident("property_name") {
            let Ok(v) = meta.require_list().and_then(|v| v.parse_args::<LitStr>()) else {
                panic!(
                    "Error while parsing `property_name`, use it like #[property_name(\"{}\")]",
                    name
                );
            };
            name = v.value();
        }
    }
    Some(PropertyMetadata {
        ident,
        ty: field.ty.clone(),
        name,
        read_only,
    })
}
