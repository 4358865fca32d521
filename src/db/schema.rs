table! {
    auth_providers (provider, provider_user_id) {
        provider -> Text,
        provider_user_id -> Text,
        user_id -> Text,
    }
}

table! {
    refresh_tokens (token_hash) {
        token_hash -> Text,
        invalid_after -> Int8,
    }
}

table! {
    users (id) {
        id -> Text,
        username -> Text,
        password_hash -> Nullable<Text>,
    }
}

joinable!(auth_providers -> users (user_id));

allow_tables_to_appear_in_same_query!(
    auth_providers,
    refresh_tokens,
    users,
);
