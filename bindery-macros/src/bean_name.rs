use syn::{ItemStruct, LitStr};

pub(crate) fn bean_name(item: &ItemStruct) -> String {
    let default_bean_name = item.ident.to_string();
    item.attrs
        .iter()
        .find_map(|attr| {
            if attr.meta.path().is_ident("bean_name") {
                let Ok(v) = attr
                    .meta
                    .require_list()
                    .and_then(|v| v.parse_args::<LitStr>())
                else {
                    panic!(
                        "Error while parsing `bean_name`, use it like #[bean_name(\"{}\")]",
                        &default_bean_name
                    );
                };
                return Some(v.value());
            }
            None
        })
        .unwrap_or(default_bean_name)
}
