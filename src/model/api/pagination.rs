use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u64 = 50;

/// Which page of a listing was asked for, from the `page_num` and
/// `page_size` query parameters. Pages count from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_num: u64,
    page_size: u64,
}

impl Pagination {
    pub fn page_num(&self) -> u64 {
        self.page_num
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// How many items come before this page.
    pub fn skip(&self) -> u64 {
        (self.page_num - 1) * self.page_size
    }

    /// Attach this page to its items.
    pub fn result<T>(self, items: Vec<T>, total: u64) -> Paginated<T> {
        Paginated {
            pagination: PaginationResult {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
            items,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page_num = match req.query_value::<u64>("page_num").unwrap_or(Ok(1)) {
            Ok(page_num) if page_num >= 1 => page_num,
            _ => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let page_size = match req
            .query_value::<u64>("page_size")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE))
        {
            Ok(page_size) if page_size >= 1 => page_size,
            _ => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        request::Outcome::Success(Self {
            page_num,
            page_size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
    pub page_num: u64,
    pub page_size: u64,
    pub total: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub pagination: PaginationResult,
    pub items: Vec<T>,
}
