use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminDescription},
            auth::{AuthToken, AUTH_TOKEN_COOKIE},
        },
        db::admin::Admin,
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![authenticate, logout]
}

/// Sign an admin in, setting the auth cookie on success.
///
/// Unknown emails, removed admins and wrong passwords all get the same answer.
#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Json<AdminDescription>> {
    let email = credentials.normalized_email();
    let found = admins
        .find_one(Admin::filter_active_email(&email), None)
        .await?;
    let admin = match found {
        Some(admin) if admin.verify_password(&credentials.password) => admin,
        _ => {
            warn!("Failed sign-in for '{email}'");
            return Err(Error::Status(
                Status::Unauthorized,
                "Incorrect email or password".to_string(),
            ));
        }
    };

    cookies.add(AuthToken::new(&admin).into_cookie(config)?);
    info!("Admin {} signed in", admin.id);
    Ok(Json(admin.into()))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
