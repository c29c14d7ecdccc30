diesel::table! {
    transactions (id) {
        id -> Text,
        owner_id -> Text,
        description -> Text,
        amount -> Text,
        date -> Text,
        direction -> Text,
        category -> Nullable<Text>,
        sync_status -> Text,
        local_updated_at -> Text,
        server_updated_at -> Nullable<Text>,
        is_deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    debts (id) {
        id -> Text,
        owner_id -> Text,
        creditor -> Text,
        amount -> Text,
        due_date -> Text,
        is_settled -> Bool,
        sync_status -> Text,
        local_updated_at -> Text,
        server_updated_at -> Nullable<Text>,
        is_deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    investment_goals (id) {
        id -> Text,
        owner_id -> Text,
        name -> Text,
        target_amount -> Text,
        contributed_amount -> Text,
        target_date -> Nullable<Text>,
        sync_status -> Text,
        local_updated_at -> Text,
        server_updated_at -> Nullable<Text>,
        is_deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    sync_state (owner_id) {
        owner_id -> Text,
        last_synced_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(transactions, debts, investment_goals, sync_state);
