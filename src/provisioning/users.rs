use super::client::{form_body, ProvisioningClient};
use crate::error::Error;
use crate::models::{DirectoryUser, UserDetail, UserListData};
use reqwest::Method;

impl ProvisioningClient {
    /// Lists the identifiers of all users the account can administer.
    pub async fn get_user_list(&self) -> Result<Vec<String>, Error> {
        let url = self.build_url(&["users"])?;
        let req = self.request(Method::GET, url);
        let resp = self.send(req).await?;
        let data: UserListData = self.expect_envelope(resp).await?;
        Ok(data.users)
    }

    /// Fetches one user's detail record.
    pub async fn get_user(&self, user_id: &str) -> Result<DirectoryUser, Error> {
        let url = self.build_url(&["users", user_id])?;
        let req = self.request(Method::GET, url);
        let resp = self.send(req).await?;
        let detail: UserDetail = self.expect_envelope(resp).await?;
        Ok(detail.into())
    }

    /// Enables a user account.
    pub async fn enable_user(&self, user_id: &str) -> Result<(), Error> {
        self.put_user_state(user_id, "enable").await
    }

    /// Disables a user account.
    pub async fn disable_user(&self, user_id: &str) -> Result<(), Error> {
        self.put_user_state(user_id, "disable").await
    }

    async fn put_user_state(&self, user_id: &str, verb: &str) -> Result<(), Error> {
        let url = self.build_url(&["users", user_id, verb])?;
        let req = form_body(self.request(Method::PUT, url), &[]);
        let resp = self.send(req).await?;
        let _: serde_json::Value = self.expect_envelope(resp).await?;
        Ok(())
    }

    /// Adds the user to a group.
    pub async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), Error> {
        self.put_group_membership(Method::POST, user_id, group).await
    }

    /// Removes the user from a group.
    pub async fn remove_from_group(&self, user_id: &str, group: &str) -> Result<(), Error> {
        self.put_group_membership(Method::DELETE, user_id, group)
            .await
    }

    async fn put_group_membership(
        &self,
        method: Method,
        user_id: &str,
        group: &str,
    ) -> Result<(), Error> {
        let url = self.build_url(&["users", user_id, "groups"])?;
        let req = form_body(self.request(method, url), &[("groupid", group)]);
        let resp = self.send(req).await?;
        let _: serde_json::Value = self.expect_envelope(resp).await?;
        Ok(())
    }
}
