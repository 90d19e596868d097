use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that any test database is dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`crate::store::Storage`], [`mongodb::Database`], and
/// [`crate::store::mongodb::Coll<T>`]. Asking for a `Database` or a `Coll<T>` backs the
/// whole test with a fresh MongoDB database; otherwise a fresh in-memory store is used.
///
/// `#[backend_test(admin)]` logs the client in as the bootstrap admin, and
/// `#[backend_test(voter)]` registers and logs in a new voter.
///
/// Any other attributes, such as `#[ignore]`, apply to the generated test.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let Injections {
        args: test_args,
        collection_idents,
        collection_types,
        uses_mongo,
    } = match check_sig(item_fn.sig.clone()) {
        Ok(injections) => injections,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name, and move its attributes onto
    // the test itself.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();
    let attrs = std::mem::take(&mut item_fn.attrs);

    // Log in the client as admin/voter if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => quote! {
            // The response borrows the client, which is moved out below.
            {
                let response = rocket_client
                    .post(uri!(crate::api::auth::login))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!({
                        "email": crate::TEST_ADMIN_EMAIL,
                        "password": crate::TEST_ADMIN_PASSWORD,
                    }).to_string())
                    .dispatch()
                    .await;
                assert_eq!(response.status(), rocket::http::Status::Ok, "admin login failed");
            }
        },
        Some(arg) if arg == "voter" => quote! {
            {
                let registration = crate::model::api::participant::Registration::example1();
                let response = rocket_client
                    .post(uri!(crate::api::auth::register))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(registration).to_string())
                    .dispatch()
                    .await;
                assert_eq!(
                    response.status(),
                    rocket::http::Status::Created,
                    "voter registration failed"
                );
            }
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    // Rewrite the test function.
    quote! {
        #[test]
        #(#attrs)*
        fn #name() {
            /// Test setup.
            async fn setup() -> (
                rocket::local::asynchronous::Client,
                crate::store::Storage,
                Option<mongodb::Database>,
            ) {
                let (storage, db) = if #uses_mongo {
                    let (storage, db) = crate::test_mongo_storage().await;
                    (storage, Some(db))
                } else {
                    (crate::store::Storage::memory(), None)
                };
                let rocket = crate::rocket_for_storage(storage.clone());
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();

                #maybe_login

                (rocket_client, storage, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: Option<mongodb::Database>) {
                if let Some(db) = db {
                    db.drop(None).await.unwrap();
                }
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, storage, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let storage_mutex = std::sync::Mutex::new(storage);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let storage = storage_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(
                    let #collection_idents = crate::store::mongodb::Coll::<#collection_types>::from_db(
                        db.as_ref().unwrap(),
                    );
                )*

                runtime.block_on(#new_name(#(#test_args),* #(,#collection_idents)*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// What a test asks to have injected.
struct Injections {
    /// Expressions for the `Client`/`Storage`/`Database` parameters, in order.
    args: Vec<TokenStream2>,
    collection_idents: Vec<Ident>,
    collection_types: Vec<Ident>,
    /// Whether the test needs a MongoDB database.
    uses_mongo: bool,
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
///
/// `Coll<T>` parameters must come after all others.
fn check_sig(sig: Signature) -> Result<Injections, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_storage = false;
    let mut has_db = false;
    let mut args = vec![];
    let mut collection_idents = vec![];
    let mut collection_types = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        let (seen, arg, what) = if type_ident == "Client" {
                            (
                                &mut has_client,
                                quote! { rocket_client },
                                "rocket::local::asynchronous::Client",
                            )
                        } else if type_ident == "Storage" {
                            (&mut has_storage, quote! { storage }, "Storage")
                        } else if type_ident == "Database" {
                            (
                                &mut has_db,
                                quote! { db.clone().unwrap() },
                                "mongodb::Database",
                            )
                        } else {
                            return Err(unexpected(input));
                        };
                        if *seen {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{what}`"),
                            ));
                        }
                        if !collection_idents.is_empty() {
                            return Err(syn::Error::new(
                                input.span(),
                                "`Coll<T>` parameters must come last",
                            ));
                        }
                        *seen = true;
                        args.push(arg);
                        continue;
                    } else if let Some(possible_collection) = type_path.path.segments.last() {
                        if possible_collection.ident == "Coll" {
                            if let PathArguments::AngleBracketed(generics) =
                                &possible_collection.arguments
                            {
                                if let Some(GenericArgument::Type(Type::Path(type_path))) =
                                    generics.args.first()
                                {
                                    if let Some(type_ident) = type_path.path.get_ident() {
                                        collection_idents.push(pat_ident.ident.clone());
                                        collection_types.push(type_ident.clone());
                                        continue;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        return Err(unexpected(input));
    }

    let uses_mongo = has_db || !collection_idents.is_empty();
    Ok(Injections {
        args,
        collection_idents,
        collection_types,
        uses_mongo,
    })
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client: Client`, `storage: Storage`, `db: Database` or `collection: Coll<T>`",
    )
}
