use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::{AdminCredentials, AdminDescription},
            auth::AuthToken,
        },
        common::RecordStatus,
        db::admin::{Admin, NewAdmin},
        mongodb::{errors::is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_admins, add_admin, remove_admin]
}

/// Every admin who can still sign in, by email.
#[get("/admins")]
async fn list_admins(_token: AuthToken, admins: Coll<Admin>) -> Result<Json<Vec<AdminDescription>>> {
    let active: Vec<Admin> = admins
        .find(Admin::filter_active(), None)
        .await?
        .try_collect()
        .await?;
    let mut listed: Vec<AdminDescription> = active.into_iter().map(Into::into).collect();
    listed.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(listed))
}

/// Give another person admin access. Emails are never reused, even once
/// their admin has been removed.
#[post("/admins", data = "<credentials>", format = "json")]
async fn add_admin(
    _token: AuthToken,
    credentials: Json<AdminCredentials>,
    admins: Coll<NewAdmin>,
) -> Result<Json<AdminDescription>> {
    let admin = NewAdmin::try_from(credentials.0)?;
    let inserted = match admins.insert_one(&admin, None).await {
        Ok(result) => result,
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::Status(
                Status::Conflict,
                format!("An admin with email '{}' already exists", admin.email),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let id: Id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::not_found("ID of inserted admin"))?
        .into();
    info!("Added admin {id} ({})", admin.email);
    Ok(Json(Admin { id, admin }.into()))
}

/// Revoke an admin's access. The record is kept, marked deleted.
#[delete("/admins/<admin_id>")]
async fn remove_admin(_token: AuthToken, admin_id: Id, admins: Coll<Admin>) -> Result<()> {
    if admins.count_documents(Admin::filter_active(), None).await? <= 1 {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "The only remaining admin cannot be removed".to_string(),
        ));
    }

    let update = doc! {
        "$set": {
            "status": RecordStatus::Deleted,
        }
    };
    let result = admins
        .update_one(Admin::filter_active_id(admin_id), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Admin {admin_id}")));
    }
    info!("Removed admin {admin_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use super::*;

    #[backend_test(admin)]
    async fn removed_admin_is_kept_but_hidden(client: Client, admins: Coll<Admin>) {
        let deputy = add_admin_expect_status(&client, &AdminCredentials::example2(), Status::Ok)
            .await
            .unwrap();
        assert_eq!(deputy.email, "deputy@example.com");

        let response = client.delete(uri!(remove_admin(*deputy.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        // Still stored, but marked deleted and no longer listed.
        let stored = admins
            .find_one(deputy.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RecordStatus::Deleted);
        let listed = list(&client).await;
        assert_eq!(
            listed.iter().map(|a| a.email.as_str()).collect::<Vec<_>>(),
            ["officer@example.com"]
        );

        // One admin is left, so no further removal is allowed.
        let response = client.delete(uri!(remove_admin(*deputy.id))).dispatch().await;
        assert_eq!(Status::UnprocessableEntity, response.status());
    }

    #[backend_test(admin)]
    async fn only_admin_cannot_be_removed(client: Client, db: Database) {
        let listed = list(&client).await;
        let response = client.delete(uri!(remove_admin(*listed[0].id))).dispatch().await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let active = Coll::<Admin>::from_db(&db)
            .count_documents(Admin::filter_active(), None)
            .await
            .unwrap();
        assert_eq!(active, 1);

        // Unknown admins are reported as such.
        add_admin_expect_status(&client, &AdminCredentials::example2(), Status::Ok).await;
        let response = client.delete(uri!(remove_admin(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn invalid_admins_refused(client: Client, admins: Coll<Admin>) {
        let not_email = AdminCredentials {
            email: "deputy".to_string(),
            password: "foobarbaz".to_string(),
        };
        add_admin_expect_status(&client, &not_email, Status::UnprocessableEntity).await;

        let short_password = AdminCredentials {
            email: "deputy@example.com".to_string(),
            password: "foo".to_string(),
        };
        add_admin_expect_status(&client, &short_password, Status::UnprocessableEntity).await;

        add_admin_expect_status(&client, &AdminCredentials::empty(), Status::UnprocessableEntity)
            .await;

        // Same email, different case.
        let shouting = AdminCredentials {
            email: "OFFICER@example.com".to_string(),
            password: "anotherpassword".to_string(),
        };
        add_admin_expect_status(&client, &shouting, Status::Conflict).await;

        assert_eq!(admins.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn admins_listed_by_email(client: Client) {
        add_admin_expect_status(&client, &AdminCredentials::example3(), Status::Ok).await;
        add_admin_expect_status(&client, &AdminCredentials::example2(), Status::Ok).await;

        let emails: Vec<String> = list(&client).await.into_iter().map(|a| a.email).collect();
        assert_eq!(
            emails,
            [
                "deputy@example.com",
                "officer@example.com",
                "scrutineer@example.com"
            ]
        );
    }

    #[backend_test]
    async fn admin_routes_need_login(client: Client) {
        let response = client.get(uri!(list_admins)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        add_admin_expect_status(&client, &AdminCredentials::example2(), Status::Unauthorized).await;
    }

    async fn list(client: &Client) -> Vec<AdminDescription> {
        let response = client.get(uri!(list_admins)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    async fn add_admin_expect_status(
        client: &Client,
        credentials: &AdminCredentials,
        status: Status,
    ) -> Option<AdminDescription> {
        let response = client
            .post(uri!(add_admin))
            .header(ContentType::JSON)
            .body(serde_json::to_string(credentials).unwrap())
            .dispatch()
            .await;
        assert_eq!(status, response.status());
        if status == Status::Ok {
            Some(serde_json::from_str(&response.into_string().await.unwrap()).unwrap())
        } else {
            None
        }
    }
}
