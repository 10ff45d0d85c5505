use crate::common::{TestApp, routes};

mod item_crud {
    use super::*;

    #[tokio::test]
    async fn create_returns_item() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &serde_json::json!({
                    "name": "Tent",
                    "category_id": category_id,
                    "container_id": container_id,
                    "status": "in",
                    "description": "4-person dome",
                    "quantity": 1,
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"].as_str().unwrap(), "Tent");
        assert_eq!(res.body["status"].as_str().unwrap(), "in");
        assert_eq!(res.body["category_id"].as_i64().unwrap(), category_id as i64);
        assert_eq!(res.body["quantity"].as_i64().unwrap(), 1);
    }

    #[tokio::test]
    async fn create_with_missing_category_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let container_id = app.create_container(&token, "Garage").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &serde_json::json!({
                    "name": "Tent",
                    "category_id": 9999,
                    "container_id": container_id,
                    "status": "in",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"].as_str().unwrap(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn create_cannot_reference_another_owners_container() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1);
        let bob = app.token_for(2);
        let category_id = app.create_category(&alice, "Camping").await;
        let foreign_container = app.create_container(&bob, "Bob's shed").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &serde_json::json!({
                    "name": "Tent",
                    "category_id": category_id,
                    "container_id": foreign_container,
                    "status": "in",
                }),
                &alice,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;

        for quantity in [0, -5] {
            let res = app
                .post_with_token(
                    routes::ITEMS,
                    &serde_json::json!({
                        "name": "Tent",
                        "category_id": category_id,
                        "container_id": container_id,
                        "status": "in",
                        "quantity": quantity,
                    }),
                    &token,
                )
                .await;

            assert_eq!(res.status, 400, "expected rejection for {quantity}");
            assert_eq!(res.body["fields"][0]["field"].as_str().unwrap(), "quantity");
        }
    }

    #[tokio::test]
    async fn update_toggles_status() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;
        let id = app
            .create_item(&token, "Tent", category_id, container_id)
            .await;

        let res = app
            .patch_with_token(
                &routes::item(id),
                &serde_json::json!({ "status": "out" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"].as_str().unwrap(), "out");
    }

    #[tokio::test]
    async fn update_clears_quantity_and_description_with_null() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;

        let res = app
            .post_with_token(
                routes::ITEMS,
                &serde_json::json!({
                    "name": "Tent",
                    "category_id": category_id,
                    "container_id": container_id,
                    "status": "in",
                    "description": "4-person dome",
                    "quantity": 2,
                }),
                &token,
            )
            .await;
        let id = res.id();

        let res = app
            .patch_with_token(
                &routes::item(id),
                &serde_json::json!({ "description": null, "quantity": null }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.body["description"].is_null());
        assert!(res.body["quantity"].is_null());
    }

    #[tokio::test]
    async fn update_cannot_move_item_to_foreign_container() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1);
        let bob = app.token_for(2);
        let category_id = app.create_category(&alice, "Camping").await;
        let container_id = app.create_container(&alice, "Garage").await;
        let foreign_container = app.create_container(&bob, "Bob's shed").await;
        let id = app
            .create_item(&alice, "Tent", category_id, container_id)
            .await;

        let res = app
            .patch_with_token(
                &routes::item(id),
                &serde_json::json!({ "container_id": foreign_container }),
                &alice,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn empty_update_returns_current_state() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;
        let id = app
            .create_item(&token, "Tent", category_id, container_id)
            .await;

        let res = app
            .patch_with_token(&routes::item(id), &serde_json::json!({}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"].as_str().unwrap(), "Tent");
    }

    #[tokio::test]
    async fn detail_includes_images() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;
        let id = app
            .create_item(&token, "Tent", category_id, container_id)
            .await;
        app.upload_image(&routes::item_images(id), "tent.jpg", None, &token)
            .await;

        let res = app.get_with_token(&routes::item(id), &token).await;

        assert_eq!(res.status, 200);
        let images = res.body["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["display_order"].as_i64().unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_item_and_its_images() {
        use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
        use server::entity::image;

        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Camping").await;
        let container_id = app.create_container(&token, "Garage").await;
        let id = app
            .create_item(&token, "Tent", category_id, container_id)
            .await;
        app.upload_image(&routes::item_images(id), "tent.jpg", None, &token)
            .await;

        let res = app.delete_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::item(id), &token).await;
        assert_eq!(res.status, 404);

        let remaining = image::Entity::find()
            .filter(image::Column::EntityId.eq(id))
            .count(&app.db)
            .await
            .expect("DB query failed");
        assert_eq!(remaining, 0);
    }
}

mod item_query {
    use super::*;

    /// Seed a standard fixture: two categories, two containers, five items.
    ///
    /// Returns (category ids, container ids, item ids) in creation order.
    async fn seed(app: &TestApp, token: &str) -> (Vec<i32>, Vec<i32>, Vec<i32>) {
        let camping = app.create_category(token, "Camping").await;
        let kitchen = app.create_category(token, "Kitchen").await;
        let garage = app.create_container(token, "Garage").await;
        let pantry = app.create_container(token, "Pantry").await;

        let mut items = Vec::new();
        for (name, cat, cont, status) in [
            ("Tent", camping, garage, "in"),
            ("Camping stove", camping, garage, "out"),
            ("Sleeping bag", camping, pantry, "in"),
            ("Blender", kitchen, pantry, "in"),
            ("Toaster", kitchen, pantry, "out"),
        ] {
            let res = app
                .post_with_token(
                    routes::ITEMS,
                    &serde_json::json!({
                        "name": name,
                        "category_id": cat,
                        "container_id": cont,
                        "status": status,
                    }),
                    token,
                )
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
            items.push(res.id());
        }

        (vec![camping, kitchen], vec![garage, pantry], items)
    }

    fn names(body: &serde_json::Value) -> Vec<&str> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn absent_criteria_return_everything() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app.get_with_token(routes::ITEMS, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn default_sort_is_newest_first() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app.get_with_token(routes::ITEMS, &token).await;

        assert_eq!(names(&res.body)[0], "Toaster");
        assert_eq!(names(&res.body)[4], "Tent");
    }

    #[tokio::test]
    async fn search_matches_substring_case_insensitively() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app
            .get_with_token(&format!("{}?search=CAMP", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(names(&res.body), vec!["Camping stove"]);
    }

    #[tokio::test]
    async fn blank_search_is_no_filter() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app
            .get_with_token(&format!("{}?search=%20%20", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let category_id = app.create_category(&token, "Fabric").await;
        let container_id = app.create_container(&token, "Closet").await;
        app.create_item(&token, "100% cotton shirt", category_id, container_id)
            .await;
        app.create_item(&token, "100x cotton blend", category_id, container_id)
            .await;

        let res = app
            .get_with_token(&format!("{}?search=100%25", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(names(&res.body), vec!["100% cotton shirt"]);
    }

    #[tokio::test]
    async fn category_set_filter_matches_any_listed_id() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (categories, _, _) = seed(&app, &token).await;

        let res = app
            .get_with_token(
                &format!("{}?category_ids={}", routes::ITEMS, categories[1]),
                &token,
            )
            .await;
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 2);

        let res = app
            .get_with_token(
                &format!(
                    "{}?category_ids={},{}",
                    routes::ITEMS,
                    categories[0],
                    categories[1]
                ),
                &token,
            )
            .await;
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
    }

    #[tokio::test]
    async fn malformed_id_set_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);

        let res = app
            .get_with_token(&format!("{}?category_ids=1,abc", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"].as_str().unwrap(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn status_filter_narrows_results() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app
            .get_with_token(&format!("{}?status=out", routes::ITEMS), &token)
            .await;
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 2);

        let res = app
            .get_with_token(&format!("{}?status=all", routes::ITEMS), &token)
            .await;
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);

        let res = app
            .get_with_token(&format!("{}?status=lost", routes::ITEMS), &token)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn criteria_combine_with_and() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (categories, containers, _) = seed(&app, &token).await;

        // Camping items, in the pantry, currently in: only the sleeping bag.
        let res = app
            .get_with_token(
                &format!(
                    "{}?category_ids={}&container_ids={}&status=in",
                    routes::ITEMS,
                    categories[0],
                    containers[1]
                ),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(names(&res.body), vec!["Sleeping bag"]);
    }

    #[tokio::test]
    async fn pages_never_skip_or_repeat_items() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        let (_, _, item_ids) = seed(&app, &token).await;

        let mut seen = Vec::new();
        for page in 1..=3 {
            let res = app
                .get_with_token(
                    &format!(
                        "{}?page={page}&per_page=2&sort_by=name&sort_order=asc",
                        routes::ITEMS
                    ),
                    &token,
                )
                .await;
            assert_eq!(res.status, 200);
            assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
            assert_eq!(res.body["pagination"]["total_pages"].as_u64().unwrap(), 3);
            for item in res.body["data"].as_array().unwrap() {
                seen.push(item["id"].as_i64().unwrap() as i32);
            }
        }

        seen.sort_unstable();
        let mut expected = item_ids.clone();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app
            .get_with_token(&format!("{}?per_page=0", routes::ITEMS), &token)
            .await;
        assert_eq!(res.body["pagination"]["per_page"].as_u64().unwrap(), 1);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);

        let res = app
            .get_with_token(&format!("{}?per_page=500", routes::ITEMS), &token)
            .await;
        assert_eq!(res.body["pagination"]["per_page"].as_u64().unwrap(), 100);

        let res = app
            .get_with_token(&format!("{}?page=0", routes::ITEMS), &token)
            .await;
        assert_eq!(res.body["pagination"]["page"].as_u64().unwrap(), 1);
    }

    #[tokio::test]
    async fn page_beyond_the_end_is_empty() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        let res = app
            .get_with_token(&format!("{}?page=99", routes::ITEMS), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
    }

    #[tokio::test]
    async fn absurd_page_number_still_returns_an_empty_page() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1);
        seed(&app, &token).await;

        // u64::MAX; the offset computation must not overflow.
        let res = app
            .get_with_token(
                &format!("{}?page=18446744073709551615&per_page=100", routes::ITEMS),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 5);
    }

    #[tokio::test]
    async fn results_are_scoped_to_the_caller() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1);
        let bob = app.token_for(2);
        seed(&app, &alice).await;

        let res = app.get_with_token(routes::ITEMS, &bob).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"].as_u64().unwrap(), 0);
    }
}
