//! Procedural macros for the roster entity stack.
//!
//! This crate provides two macros:
//! - `#[derive(Entity)]`: inspects a struct and generates its table mapping, typed
//!   query columns and a default `RowAdapter` for use in a repository.
//! - `#[repository(...)]`: generates an asynchronous repository module for an entity,
//!   with one pair of finders per listed field.

use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    spanned::Spanned,
    Data, DeriveInput, Fields, Ident, ItemMod, LitStr, Token, Type, TypePath,
};

use inflections::Inflect;

// --- Helper Structs & Functions for Parsing ---

/// A helper struct for parsing `key = "value"` style meta attributes.
struct MetaNameValue {
    pub path: syn::Path,
    pub _eq_token: Token![=],
    pub value: LitStr,
}

impl Parse for MetaNameValue {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        Ok(Self {
            path: input.parse()?,
            _eq_token: input.parse()?,
            value: input.parse()?,
        })
    }
}

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_some() || type_path.path.leading_colon.is_some() {
            return None;
        }
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident != "Option" {
                return None;
            }
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                    return Some(inner_ty);
                }
            }
        }
    }
    None
}

/// Storage class for a supported scalar type, by its token string.
fn sql_type_tokens(scalar: &str) -> Option<proc_macro2::TokenStream> {
    match scalar {
        "String" => Some(quote! { ::roster_core::SqlType::Text }),
        "i32" | "i64" | "bool" => Some(quote! { ::roster_core::SqlType::Integer }),
        "f64" => Some(quote! { ::roster_core::SqlType::Real }),
        _ => None,
    }
}

/// Holds parsed metadata about a single struct field.
#[derive(Clone)]
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    column_name: String,
    is_id: bool,
    is_skipped: bool,
}

impl FieldMetadata {
    fn is_option(&self) -> bool {
        get_option_inner(&self.ty).is_some()
    }

    /// The type with any `Option<..>` wrapper removed.
    fn scalar_ty(&self) -> &Type {
        get_option_inner(&self.ty).unwrap_or(&self.ty)
    }

    fn scalar_ty_str(&self) -> String {
        self.scalar_ty().to_token_stream().to_string().replace(' ', "")
    }
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Entity)] only supports structs with named fields.",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Entity)] can only be used on structs.",
            ))
        }
    };

    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let mut column_name = ident.to_string();
        let mut is_id = false;
        let mut is_skipped = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("fetch") {
                continue;
            }
            // Parse errors become compile errors, e.g. for #[fetch(column)]
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let s: LitStr = meta.value()?.parse()?;
                    column_name = s.value();
                    Ok(())
                } else if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    is_skipped = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `id`, `skip` or `column = \"...\"`"))
                }
            })?;
        }
        out.push(FieldMetadata {
            ident,
            ty: field.ty.clone(),
            column_name,
            is_id,
            is_skipped,
        });
    }
    Ok(out)
}

/// Basic validation of table and column names to avoid generating invalid SQL identifiers.
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity, fetch))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(&input) {
        Ok(ts) => TokenStream::from(ts),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let vis = &input.vis;
    let fields_metadata = parse_field_metadata(input)?;

    // --- Get table name ---
    // Look for `#[entity(table = "...")]` first.
    let mut table_name_override = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            let list = attr.meta.require_list()?;
            let MetaNameValue { path, value, .. } = syn::parse2(list.tokens.clone())?;
            if !path.is_ident("table") {
                return Err(syn::Error::new(path.span(), "expected `table = \"...\"`"));
            }
            table_name_override = Some(value.value());
        }
    }

    // If no override, deduce it from the struct name (`Member` -> `members`).
    let table_name = table_name_override
        .unwrap_or_else(|| format!("{}s", struct_name.to_string().to_snake_case()));

    if !is_valid_ident(&table_name) {
        return Err(syn::Error::new(
            struct_name.span(),
            format!("Invalid table name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.", table_name),
        ));
    }
    for f in fields_metadata.iter().filter(|f| !f.is_skipped) {
        if !is_valid_ident(&f.column_name) {
            return Err(syn::Error::new(
                f.ident.span(),
                format!("Invalid column name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.", f.column_name),
            ));
        }
        if sql_type_tokens(&f.scalar_ty_str()).is_none() {
            return Err(syn::Error::new(
                f.ty.span(),
                format!("Unsupported field type `{}`. Use String, i32, i64, f64, bool (optionally wrapped in Option) or mark the field with #[fetch(skip)].", f.ty.to_token_stream()),
            ));
        }
    }

    // Validate exactly one #[fetch(id)]
    let ids: Vec<_> = fields_metadata.iter().filter(|f| f.is_id).collect();
    let id_field = match ids.as_slice() {
        [one] => *one,
        [] => {
            return Err(syn::Error::new(
                struct_name.span(),
                "A field must be marked with #[fetch(id)]. Hint: mark your primary key field like `#[fetch(id)]`.",
            ))
        }
        many => {
            return Err(syn::Error::new(
                many[1].ident.span(),
                format!("Exactly one field must be marked with #[fetch(id)] (found {}).", many.len()),
            ))
        }
    };
    if id_field.is_skipped {
        return Err(syn::Error::new(
            id_field.ident.span(),
            "the #[fetch(id)] field cannot also be #[fetch(skip)]",
        ));
    }

    let persisted: Vec<&FieldMetadata> = fields_metadata.iter().filter(|f| !f.is_skipped).collect();

    // --- Implement `Fetchable` ---
    let select_columns: Vec<_> = persisted.iter().map(|f| &f.column_name).collect();
    let column_defs: Vec<_> = persisted
        .iter()
        .map(|f| {
            let name = &f.column_name;
            let sql_type = sql_type_tokens(&f.scalar_ty_str());
            let nullable = f.is_option() && !f.is_id;
            let primary_key = f.is_id;
            quote! {
                ::roster_core::ColumnDef {
                    name: #name,
                    sql_type: #sql_type,
                    nullable: #nullable,
                    primary_key: #primary_key,
                }
            }
        })
        .collect();

    let fetchable_impl = quote! {
        impl ::roster_core::Fetchable for #struct_name {
            const TABLE: &'static str = #table_name;
            const SELECT_COLUMNS: &'static [&'static str] = &[#(#select_columns),*];
            const COLUMN_DEFS: &'static [::roster_core::ColumnDef] = &[#(#column_defs),*];
        }
    };

    // --- Implement `Identifiable` ---
    let id_ident = &id_field.ident;
    let key_ty = id_field.scalar_ty();
    let id_column_name = &id_field.column_name;

    let id_accessor = if id_field.is_option() {
        quote! { self.#id_ident.clone() }
    } else {
        quote! { Some(self.#id_ident.clone()) }
    };

    let identifiable_impl = quote! {
        impl ::roster_core::Identifiable for #struct_name {
            type Key = #key_ty;
            const ID_COLUMN: &'static str = #id_column_name;
            fn id(&self) -> Option<Self::Key> {
                #id_accessor
            }
        }
    };

    // --- Implement `Insertable` ---
    let insert_fields: Vec<_> = persisted.iter().filter(|f| !f.is_id).collect();
    let insert_columns: Vec<_> = insert_fields.iter().map(|f| &f.column_name).collect();
    let insert_values: Vec<_> = insert_fields
        .iter()
        .map(|f| {
            let ident = &f.ident;
            quote! { ::roster_core::ParamValue::from(self.#ident.clone()) }
        })
        .collect();

    let insertable_impl = quote! {
        impl ::roster_core::Insertable for #struct_name {
            const INSERT_COLUMNS: &'static [&'static str] = &[#(#insert_columns),*];
            fn insert_values(&self) -> Vec<::roster_core::ParamValue> {
                vec![#(#insert_values),*]
            }
        }
    };

    // --- Typed columns ---
    let columns_struct_name = Ident::new(&format!("{}Columns", struct_name), struct_name.span());
    let column_fields: Vec<_> = persisted
        .iter()
        .map(|f| {
            let ident = &f.ident;
            let ty = if f.is_id { key_ty } else { &f.ty };
            quote! { pub #ident: ::roster_core::query::Column<#struct_name, #ty> }
        })
        .collect();
    let column_inits: Vec<_> = persisted
        .iter()
        .map(|f| {
            let ident = &f.ident;
            let col = &f.column_name;
            quote! { #ident: ::roster_core::query::Column::new(#col) }
        })
        .collect();
    let columns_doc = format!("Typed query columns of [`{}`].", struct_name);

    let columns_impl = quote! {
        #[doc = #columns_doc]
        #[derive(Debug, Clone, Copy)]
        #vis struct #columns_struct_name {
            #(#column_fields),*
        }

        impl #struct_name {
            pub const COLUMNS: #columns_struct_name = #columns_struct_name {
                #(#column_inits),*
            };
        }
    };

    // --- Generate `RowAdapter` ---
    let adapter_struct_name = Ident::new(&format!("{}RowAdapter", struct_name), struct_name.span());

    // Columns are selected in SELECT_COLUMNS order, so indices count persisted fields only.
    let mut col_index: i32 = 0;
    let libsql_get_mappings: Vec<_> = fields_metadata
        .iter()
        .map(|f| {
            let ident = &f.ident;
            if f.is_skipped {
                return quote! { #ident: ::core::default::Default::default() };
            }
            let idx = col_index;
            col_index += 1;
            // Booleans are stored as 0/1 integers.
            if f.scalar_ty_str() == "bool" {
                return if f.is_option() {
                    quote! { #ident: row
                        .get::<Option<i64>>(#idx)
                        .map_err(::roster_core::RepoError::mapping)?
                        .map(|v| v != 0) }
                } else {
                    quote! { #ident: row
                        .get::<i64>(#idx)
                        .map_err(::roster_core::RepoError::mapping)? != 0 }
                };
            }
            quote! { #ident: row
                .get(#idx)
                .map_err(::roster_core::RepoError::mapping)? }
        })
        .collect();

    let row_adapter_impls = quote! {
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #adapter_struct_name;

        // Compiled only in crates that link libsql and opt in through their own feature.
        #[cfg(feature = "backend-adapters")]
        impl ::roster_core::RowAdapter<#struct_name> for #adapter_struct_name {
            type Row = ::libsql::Row;
            fn from_row(&self, row: &Self::Row) -> ::roster_core::RepoResult<#struct_name> {
                Ok(#struct_name {
                    #(#libsql_get_mappings),*
                })
            }
        }
    };

    Ok(quote! {
        #fetchable_impl
        #identifiable_impl
        #insertable_impl
        #columns_impl
        #row_adapter_impls
    })
}

// --- `repository` attribute macro ---

/// Struct to parse a finder like `find_by_name: String`
struct Finder {
    name: Ident,
    ty: Type,
}

impl Parse for Finder {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;
        Ok(Finder { name, ty })
    }
}

/// Struct for parsing the main macro arguments
struct RepositoryArgs {
    entity: Type,
    backend: Ident,
    finders: Option<Punctuated<Finder, Token![,]>>,
}

impl Parse for RepositoryArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut entity = None;
        let mut backend = None;
        let mut finders = None;

        let attrs = Punctuated::<syn::Meta, Token![,]>::parse_terminated(input)?;
        for meta in attrs {
            match meta {
                syn::Meta::NameValue(nv) => {
                    let ident_str = nv
                        .path
                        .get_ident()
                        .ok_or_else(|| syn::Error::new(nv.path.span(), "Expected an identifier"))?
                        .to_string();
                    match ident_str.as_str() {
                        "entity" => {
                            if let syn::Expr::Path(expr_path) = nv.value {
                                entity = Some(Type::Path(TypePath {
                                    qself: None,
                                    path: expr_path.path,
                                }));
                            } else {
                                return Err(syn::Error::new(
                                    nv.value.span(),
                                    "Expected a type for `entity`",
                                ));
                            }
                        }
                        "backend" => {
                            if let syn::Expr::Path(expr_path) = nv.value {
                                backend = expr_path.path.get_ident().cloned();
                            } else {
                                return Err(syn::Error::new(
                                    nv.value.span(),
                                    "Expected an identifier for `backend`",
                                ));
                            }
                        }
                        _ => return Err(syn::Error::new(nv.path.span(), "Unknown attribute")),
                    }
                }
                syn::Meta::List(list) => {
                    if list.path.is_ident("finders") {
                        let parsed_finders = list
                            .parse_args_with(Punctuated::<Finder, Token![,]>::parse_terminated)?;
                        finders = Some(parsed_finders);
                    } else {
                        return Err(syn::Error::new(list.path.span(), "Unknown attribute list"));
                    }
                }
                _ => return Err(syn::Error::new(meta.span(), "Unsupported attribute format")),
            }
        }
        Ok(RepositoryArgs {
            entity: entity
                .ok_or_else(|| syn::Error::new(input.span(), "`entity` is a required attribute"))?,
            backend: backend.ok_or_else(|| {
                syn::Error::new(input.span(), "`backend` is a required attribute")
            })?,
            finders,
        })
    }
}

#[proc_macro_attribute]
pub fn repository(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RepositoryArgs);
    let input_mod = parse_macro_input!(item as ItemMod);

    let mod_name = &input_mod.ident;
    let mod_vis = &input_mod.vis;
    let entity_ty = &args.entity;

    // Build the path to the generated <Entity>RowAdapter type by replacing the
    // last path segment ident with "<Entity>RowAdapter".
    let adapter_path_ts: proc_macro2::TokenStream = match entity_ty {
        syn::Type::Path(tp) => {
            let mut p = tp.path.clone();
            if let Some(last) = p.segments.last_mut() {
                let adapter_ident =
                    syn::Ident::new(&format!("{}RowAdapter", last.ident), last.ident.span());
                last.ident = adapter_ident;
                last.arguments = syn::PathArguments::None;
            }
            quote! { #p }
        }
        _ => {
            return TokenStream::from(
                syn::Error::new(entity_ty.span(), "`entity` must be a type path")
                    .to_compile_error(),
            )
        }
    };

    let (backend_repo_ty, backend_row_ty) = match args.backend.to_string().as_str() {
        "Libsql" => (
            quote! { ::roster::backends::LibsqlRepository },
            quote! { ::libsql::Row },
        ),
        other => {
            return TokenStream::from(
                syn::Error::new(
                    args.backend.span(),
                    format!("Unsupported backend: `{}`. Supported backends are: Libsql", other),
                )
                .to_compile_error(),
            )
        }
    };

    let mut find_by_methods = Vec::new();
    if let Some(finders) = &args.finders {
        for finder in finders {
            let method_name = &finder.name;
            let ty = &finder.ty;
            let finder_str = method_name.to_string();
            let field_name_str = finder_str.strip_prefix("find_by_").unwrap_or(&finder_str);
            let field_name_lit = LitStr::new(field_name_str, method_name.span());
            let find_one_name =
                Ident::new(&format!("find_one_by_{}", field_name_str), method_name.span());

            let ty_string = ty.to_token_stream().to_string();
            if !matches!(ty_string.as_str(), "String" | "i32" | "i64" | "f64" | "bool") {
                let err_msg = format!(
                    "Unsupported finder type: {}. Use String, i32, i64, f64, or bool.",
                    ty_string
                );
                find_by_methods.push(quote! { compile_error!(#err_msg); });
                continue;
            }

            find_by_methods.push(quote! {
                pub async fn #method_name(&self, value: &#ty) -> ::roster_core::RepoResult<Vec<#entity_ty>> {
                    let param = ::roster_core::ParamValue::from(value.clone());
                    self.inner.find_by_field(#field_name_lit, param).await
                }

                pub async fn #find_one_name(&self, value: &#ty) -> ::roster_core::RepoResult<Option<#entity_ty>> {
                    let column = ::roster_core::query::Column::<#entity_ty, #ty>::new(#field_name_lit);
                    self.inner
                        .fetch_one(::roster_core::query::Query::filter(column.eq(value.clone())))
                        .await
                }
            });
        }
    }

    let expanded = quote! {
        #mod_vis mod #mod_name {
            use super::*;
            use ::roster_core::{RowAdapter, Repository as _};

            pub struct Repository<A>
            where
                A: RowAdapter<#entity_ty, Row = #backend_row_ty> + Send + Sync + 'static,
            {
                inner: #backend_repo_ty<#entity_ty, A>,
            }

            impl<A> Repository<A>
            where
                A: RowAdapter<#entity_ty, Row = #backend_row_ty> + Send + Sync + 'static,
                #backend_repo_ty<#entity_ty, A>: ::roster_core::Repository<#entity_ty>,
            {
                pub fn new(backend_repo: #backend_repo_ty<#entity_ty, A>) -> Self {
                    Self { inner: backend_repo }
                }

                #(#find_by_methods)*
            }

            // Convenience constructor when using the default generated RowAdapter for the entity.
            #[cfg(feature = "backend-adapters")]
            impl Repository<#adapter_path_ts> {
                pub fn from_factory(factory: &::roster::backends::LibsqlSessionFactory) -> Self {
                    Self { inner: factory.repository(#adapter_path_ts) }
                }
            }

            #[::roster_core::async_trait]
            impl<A> ::roster_core::Repository<#entity_ty> for Repository<A>
            where
                A: RowAdapter<#entity_ty, Row = #backend_row_ty> + Send + Sync + 'static,
                #backend_repo_ty<#entity_ty, A>: ::roster_core::Repository<#entity_ty>,
            {
                async fn find_by_id(&self, id: &<#entity_ty as ::roster_core::Identifiable>::Key) -> ::roster_core::RepoResult<Option<#entity_ty>> {
                    self.inner.find_by_id(id).await
                }

                async fn find_by_field(&self, field_name: &str, value: ::roster_core::ParamValue) -> ::roster_core::RepoResult<Vec<#entity_ty>> {
                    self.inner.find_by_field(field_name, value).await
                }

                async fn fetch(&self, query: &::roster_core::query::Query<#entity_ty>) -> ::roster_core::RepoResult<Vec<#entity_ty>> {
                    self.inner.fetch(query).await
                }

                async fn fetch_one(&self, query: ::roster_core::query::Query<#entity_ty>) -> ::roster_core::RepoResult<Option<#entity_ty>> {
                    self.inner.fetch_one(query).await
                }

                async fn insert(&self, entity: &#entity_ty) -> ::roster_core::RepoResult<#entity_ty> {
                    self.inner.insert(entity).await
                }

                async fn count(&self) -> ::roster_core::RepoResult<u64> {
                    self.inner.count().await
                }
            }
        }
    };

    TokenStream::from(expanded)
}
