//! [`Context`]-related definitions.

use std::sync::{
    atomic::{self, AtomicU16},
    Arc,
};

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use juniper::{
    http::{GraphQLBatchResponse, GraphQLResponse},
    IntoFieldError as _,
};
use serde::Deserialize;
use service::domain::user;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{define_error, AsError as _, Error, JuniperResponse, Service};

/// Application context.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Identity-token decoding [`Keys`].
    keys: Keys,

    /// Error status code.
    error_status_code: AtomicU16,

    /// Parts of the HTTP request.
    parts: http::request::Parts,

    /// [`Identity`] of the current caller.
    identity: OnceCell<Identity>,

    /// Last authentication [`Error`].
    auth_error: OnceCell<Error>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the error status code of this [`Context`].
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn error_status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(
            self.error_status_code.load(atomic::Ordering::Relaxed),
        )
        .expect("invalid status code")
    }

    /// Sets the error status code for this [`Context`].
    ///
    /// Provided [`http::StatusCode`] will be applied to the response.
    pub fn set_error_status_code(&self, status_code: http::StatusCode) {
        self.error_status_code
            .store(status_code.as_u16(), atomic::Ordering::Relaxed);
    }

    /// Helper method calling [`Context::set_error_status_code()`] inside
    /// [`Result::map_err()`] closure.
    pub fn error(&self) -> impl FnOnce(Error) -> Error + '_ {
        move |err| {
            self.set_error_status_code(err.status_code);
            err
        }
    }

    /// Returns the [`Identity`] of the current caller.
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the provided identity token is invalid.
    pub async fn identity(&self) -> Result<Identity, Error> {
        self.identity
            .get_or_try_init(|| async {
                match self
                    .auth_error
                    .get_or_try_init(|| async {
                        match self.do_authentication().await {
                            Ok(i) => Err(i),
                            Err(e) => Ok(e),
                        }
                    })
                    .await
                {
                    Ok(e) => Err(e),
                    Err(i) => Ok(i),
                }
            })
            .await
            .copied()
            .map_err(Clone::clone)
    }

    /// Returns the [`Identity`] of the current caller, requiring it to be an
    /// [`Admin`].
    ///
    /// # Errors
    ///
    /// Errors if the caller is not authenticated or is not an [`Admin`].
    ///
    /// [`Admin`]: user::Role::Admin
    pub async fn admin(&self) -> Result<Identity, Error> {
        let identity = self.identity().await?;
        if identity.role != user::Role::Admin {
            return Err(self.error()(crate::api::PrivilegeError::Admin.into()));
        }
        Ok(identity)
    }

    /// Applies the [`juniper::Variables`] provided by the client on GraphQL
    /// subscription initialization.
    ///
    /// # Errors
    ///
    /// Errors if the provided variables are invalid.
    pub(crate) fn apply_subscription_variables(
        &mut self,
        vars: &juniper::Variables,
    ) -> Result<(), Error> {
        if let Some(token) = vars.get("authToken") {
            let token = token
                .as_string_value()
                .ok_or_else(|| Error::from(AuthError::InvalidVariables))?;
            let token = format!("Bearer {token}")
                .parse()
                .map_err(|_| Error::from(AuthError::InvalidVariables))?;
            drop(
                self.parts
                    .headers
                    .insert(http::header::AUTHORIZATION, token),
            );
        }

        Ok(())
    }

    /// Performs the caller authentication.
    ///
    /// The identity token is issued by an external identity service and only
    /// decoded here, never minted.
    ///
    /// # Errors
    ///
    /// Errors if the provided identity token is invalid.
    async fn do_authentication(&self) -> Result<Identity, Error> {
        let res = self
            .parts
            .clone()
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        match res {
            Ok(TypedHeader(Authorization(bearer))) => {
                let token = jsonwebtoken::decode::<Claims>(
                    bearer.token(),
                    &self.keys.decoding,
                    &jsonwebtoken::Validation::default(),
                )
                .map_err(|_| Error::from(AuthError::AuthorizationRequired))?;

                let role = token
                    .claims
                    .role
                    .parse()
                    .map_err(|_| {
                        Error::from(AuthError::AuthorizationRequired)
                    })?;

                Ok(Identity {
                    user_id: token.claims.sub.into(),
                    role,
                })
            }
            Err(e) => {
                if e.is_missing() {
                    Err(AuthError::AuthorizationRequired.into())
                } else {
                    Err(e.into_error())
                }
            }
        }
        .map_err(self.error())
    }
}

impl juniper::Context for Context {}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = JuniperResponse;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let missing = |what: &'static str| JuniperResponse {
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            response: GraphQLBatchResponse::Single(GraphQLResponse::error(
                Error::internal(&format!("missing `{what}` extension"))
                    .into_field_error(),
            )),
        };

        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| missing("Service"))?;
        let keys = parts
            .extensions
            .get::<Keys>()
            .cloned()
            .ok_or_else(|| missing("Keys"))?;

        Ok(Self {
            service,
            keys,
            error_status_code: AtomicU16::new(
                http::StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            ),
            parts: parts.clone(),
            identity: OnceCell::new(),
            auth_error: OnceCell::new(),
        })
    }
}

/// Identity of an authenticated caller, as asserted by the external
/// identity service.
#[derive(Clone, Copy, Debug)]
pub struct Identity {
    /// ID of the caller.
    pub user_id: user::Id,

    /// [`Role`] of the caller.
    ///
    /// [`Role`]: user::Role
    pub role: user::Role,
}

/// Identity-token decoding keys.
#[derive(Clone, derive_more::Debug)]
pub struct Keys {
    /// Key the identity tokens are verified with.
    #[debug(skip)]
    pub decoding: Arc<jsonwebtoken::DecodingKey>,
}

/// Claims carried by an identity token.
///
/// Expiration is validated by [`jsonwebtoken`] itself.
#[derive(Debug, Deserialize)]
struct Claims {
    /// ID of the authenticated user.
    sub: Uuid,

    /// Role of the authenticated user, in `SCREAMING_SNAKE_CASE`.
    role: String,
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_VARIABLES"]
        #[status = BAD_REQUEST]
        #[message = "Invalid subscription authorization variables"]
        InvalidVariables,
    }
}
